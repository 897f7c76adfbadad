//! A benchmarking harness that measures how fast tabular data can be pulled
//! out of SQL Server into an in-memory frame, and what each path costs in
//! peak resident memory.
//!
//! Four access methods are compared, the cross-product of two connectivity
//! paths and two target representations:
//! - a raw [tiberius] client decoding the result stream straight into Apache
//!   Arrow record batches (`arrow_direct`) or materializing row tuples into a
//!   labelled row frame (`rows_direct`),
//! - a [bb8]-pooled connection doing the same two conversions
//!   (`arrow_pooled`, `rows_pooled`).
//!
//! The harness itself is deliberately thin: query execution, wire decoding
//! and the columnar representation are all delegated to the underlying
//! libraries. What lives here is the [bench] driver that times each
//! method×size combination, the [measure] probes that sample resident memory
//! while a case runs, and the [report] emitter that turns a run into a
//! markdown report and a raw CSV.
//!
//! Cases run strictly sequentially; overlapping them would invalidate both
//! the wall-clock and the memory numbers.
//!
//! ## Transitive dependency on arrow
//!
//! If you depend on `frame_bench` as a library, use the `arrow` re-export
//! from this crate rather than depending on `arrow` directly, unless you can
//! pin exactly the same version.

pub mod bench;
pub mod config;
mod errors;
pub mod frame;
pub mod measure;
pub mod methods;
pub mod report;

pub use arrow;
pub use errors::BenchError;
