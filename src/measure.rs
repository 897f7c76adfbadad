//! Process-level resident-memory sampling.
//!
//! Exact per-allocation accounting is not available uniformly across the
//! libraries under test, so the probe samples the process RSS from a
//! background thread while a case runs and keeps the peak. The precision
//! limits of this strategy (sampling interval, allocator retention between
//! cases) are spelled out in the emitted report.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Peak and baseline RSS observed by one probe, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct MemoryReading {
    pub baseline: u64,
    pub peak: u64,
}

impl MemoryReading {
    /// Peak growth over the baseline, saturating at zero.
    pub fn delta(&self) -> u64 {
        self.peak.saturating_sub(self.baseline)
    }
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / 1_048_576.0
}

/// Samples the process RSS at a fixed interval between [MemoryProbe::start]
/// and [MemoryProbe::finish], recording the peak.
///
/// A baseline sample is taken synchronously at start and a final sample at
/// finish, so even a case shorter than one sampler tick gets a reading as
/// long as its result is still alive when the probe stops.
pub struct MemoryProbe {
    pid: Pid,
    baseline: u64,
    peak: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MemoryProbe {
    pub fn start(interval: Duration) -> Self {
        let pid = Pid::from_u32(std::process::id());
        let mut sys = System::new();
        let baseline = sample_rss(&mut sys, pid).unwrap_or(0);

        let peak = Arc::new(AtomicU64::new(baseline));
        let shutdown = Arc::new(AtomicBool::new(false));

        let sampler_peak = peak.clone();
        let sampler_shutdown = shutdown.clone();
        let handle = thread::Builder::new()
            .name("rss-sampler".to_string())
            .spawn(move || {
                let mut sys = System::new();
                while !sampler_shutdown.load(Ordering::Relaxed) {
                    if let Some(rss) = sample_rss(&mut sys, pid) {
                        sampler_peak.fetch_max(rss, Ordering::Relaxed);
                    }
                    thread::sleep(interval);
                }
            })
            .ok();

        if handle.is_none() {
            log::warn!("could not spawn rss-sampler; falling back to start/stop samples only");
        }

        MemoryProbe { pid, baseline, peak, shutdown, handle }
    }

    pub fn finish(mut self) -> MemoryReading {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        let mut sys = System::new();
        if let Some(rss) = sample_rss(&mut sys, self.pid) {
            self.peak.fetch_max(rss, Ordering::Relaxed);
        }

        MemoryReading {
            baseline: self.baseline,
            peak: self.peak.load(Ordering::Relaxed),
        }
    }
}

impl Drop for MemoryProbe {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn sample_rss(sys: &mut System, pid: Pid) -> Option<u64> {
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::new().with_memory(),
    );
    sys.process(pid).map(|process| process.memory())
}
