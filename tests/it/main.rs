mod test_config;
mod test_report;
mod test_tiberius_live;
