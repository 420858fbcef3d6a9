// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Synchronous resource snapshots taken around an instrumented operation.
//!
//! A snapshot never awaits: everything it reads is available from the
//! calling thread, so nothing else can run between the reading of its fields.

use std::time::{Duration, Instant};

use sysinfo::{Pid, System};

/// Point-in-time view of the resources the metrics are derived from.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSnapshot {
    /// Wall clock at capture.
    pub taken_at: Instant,
    /// Logical processors visible to the process.
    pub logical_cpus: usize,
    /// Resident set size of this process in bytes (0 if unavailable).
    pub resident_bytes: u64,
}

impl ResourceSnapshot {
    /// Capture the current state of the process.
    ///
    /// The clock is read first, so `taken_at` marks the start of the capture.
    pub fn capture() -> Self {
        let taken_at = Instant::now();
        Self {
            taken_at,
            logical_cpus: num_cpus::get(),
            resident_bytes: resident_memory(),
        }
    }

    /// Elapsed wall time since an earlier snapshot.
    pub fn elapsed_since(&self, earlier: &ResourceSnapshot) -> Duration {
        self.taken_at.saturating_duration_since(earlier.taken_at)
    }

    /// Change in logical processor count since an earlier snapshot.
    pub fn cpu_delta(&self, earlier: &ResourceSnapshot) -> i64 {
        self.logical_cpus as i64 - earlier.logical_cpus as i64
    }

    /// Change in resident memory since an earlier snapshot; negative when
    /// memory was released.
    pub fn memory_delta(&self, earlier: &ResourceSnapshot) -> i64 {
        self.resident_bytes as i64 - earlier.resident_bytes as i64
    }
}

/// Resident memory of the current process in bytes.
fn resident_memory() -> u64 {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return 0;
    };
    process_memory(pid)
}

fn process_memory(pid: Pid) -> u64 {
    let mut sys = System::new();
    sys.refresh_process(pid);
    sys.process(pid).map(|p| p.memory()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_capture_reads_process() {
        let snap = ResourceSnapshot::capture();
        assert!(snap.logical_cpus > 0);
        assert!(snap.resident_bytes > 0);
    }

    #[test]
    fn test_deltas() {
        let start = ResourceSnapshot::capture();
        thread::sleep(Duration::from_millis(5));
        let end = ResourceSnapshot::capture();

        assert!(end.elapsed_since(&start) >= Duration::from_millis(5));
        assert_eq!(end.cpu_delta(&start), 0);
    }

    #[test]
    fn test_memory_delta_can_be_negative() {
        let earlier = ResourceSnapshot {
            taken_at: Instant::now(),
            logical_cpus: 4,
            resident_bytes: 2048,
        };
        let later = ResourceSnapshot {
            taken_at: Instant::now(),
            logical_cpus: 4,
            resident_bytes: 1024,
        };
        assert_eq!(later.memory_delta(&earlier), -1024);
    }
}
