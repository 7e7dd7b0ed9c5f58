//! Background resource sampler.
//!
//! Pure telemetry: samples never feed back into pass/fail decisions. The
//! sampler runs on its own thread (sysinfo refreshes are blocking) with a
//! cooperative stop flag; the sample buffer is owned by the thread and handed
//! back through the join, so the workflow and the sampler share nothing but
//! the flag while both are live.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::debug;

/// Stop-flag poll granularity; bounds stop latency.
const STOP_SLICE: Duration = Duration::from_millis(100);

/// One point-in-time resource reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSample {
    pub at: DateTime<Utc>,
    /// System-wide CPU utilization, percent.
    pub cpu_percent: f32,
    /// System-wide used memory, bytes.
    pub memory_used_bytes: u64,
    /// Target-process CPU, percent; `None` when no pid was supplied or the
    /// process is gone.
    pub process_cpu_percent: Option<f32>,
    /// Target-process resident memory, bytes.
    pub process_memory_bytes: Option<u64>,
}

/// Handle to a running sampler thread. Caller-owned; dropping it without
/// [`stop`](SamplerHandle::stop) detaches the thread, which then exits on
/// its next flag poll with the samples discarded.
pub struct SamplerHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Vec<ResourceSample>>,
}

impl SamplerHandle {
    /// Starts sampling every `interval`, optionally tracking `pid`.
    pub fn start(pid: Option<u32>, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let thread = std::thread::spawn(move || {
            let mut system = System::new();
            let mut samples = Vec::new();

            // Always samples at least once, even if the stop request lands
            // before the first reading.
            loop {
                system.refresh_cpu_usage();
                system.refresh_memory();

                let (process_cpu, process_memory) = match pid {
                    Some(pid) => {
                        let pid = Pid::from_u32(pid);
                        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                        match system.process(pid) {
                            Some(process) => (Some(process.cpu_usage()), Some(process.memory())),
                            None => (None, None),
                        }
                    }
                    None => (None, None),
                };

                samples.push(ResourceSample {
                    at: Utc::now(),
                    cpu_percent: system.global_cpu_usage(),
                    memory_used_bytes: system.used_memory(),
                    process_cpu_percent: process_cpu,
                    process_memory_bytes: process_memory,
                });

                // Sliced sleep so a stop request is honored promptly even
                // with long intervals.
                let mut remaining = interval;
                while remaining > Duration::ZERO && !flag.load(Ordering::Relaxed) {
                    let slice = remaining.min(STOP_SLICE);
                    std::thread::sleep(slice);
                    remaining = remaining.saturating_sub(slice);
                }
                if flag.load(Ordering::Relaxed) {
                    break;
                }
            }
            samples
        });

        Self { stop, thread }
    }

    /// Stops the sampler and returns everything it collected.
    pub fn stop(self) -> Vec<ResourceSample> {
        self.stop.store(true, Ordering::Relaxed);
        let samples = self.thread.join().unwrap_or_default();
        debug!(count = samples.len(), "resource sampler stopped");
        samples
    }
}
