//! Kernel counters read from procfs.
//!
//! The readers convert procfs structures into plain values so the collectors
//! stay testable on any platform. Outside Linux every reader fails with
//! [`CollectionError::Source`].

use sonic_exporter_framework::CollectionError;

/// Cumulative time one CPU spent in each mode, in seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuSeconds {
    pub cpu: usize,
    pub user: f64,
    pub nice: f64,
    pub system: f64,
    pub idle: f64,
    pub iowait: Option<f64>,
    pub irq: Option<f64>,
    pub softirq: Option<f64>,
    pub steal: Option<f64>,
}

impl CpuSeconds {
    /// `(mode, seconds)` pairs for every mode the kernel reported.
    pub fn modes(&self) -> Vec<(&'static str, f64)> {
        let mut modes = vec![
            ("user", self.user),
            ("nice", self.nice),
            ("system", self.system),
            ("idle", self.idle),
        ];
        for (mode, value) in [
            ("iowait", self.iowait),
            ("irq", self.irq),
            ("softirq", self.softirq),
            ("steal", self.steal),
        ] {
            if let Some(value) = value {
                modes.push((mode, value));
            }
        }
        modes
    }
}

/// System-wide counters from `/proc/stat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KernelCounters {
    pub boot_time: u64,
    pub context_switches: u64,
    pub forks: u64,
    pub procs_running: Option<u32>,
    pub procs_blocked: Option<u32>,
}

/// One line of `/proc/diskstats`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskCounters {
    pub device: String,
    pub reads: u64,
    pub sectors_read: u64,
    pub read_ms: u64,
    pub writes: u64,
    pub sectors_written: u64,
    pub write_ms: u64,
    pub in_progress: u64,
    pub io_ms: u64,
}

#[cfg(target_os = "linux")]
mod imp {
    use super::*;
    use procfs::CurrentSI;

    fn secs(ticks: u64, tps: f64) -> f64 {
        ticks as f64 / tps
    }

    /// Per-CPU mode times and system counters from `/proc/stat`.
    pub fn kernel_stats() -> Result<(Vec<CpuSeconds>, KernelCounters), CollectionError> {
        let stat = procfs::KernelStats::current()
            .map_err(|e| CollectionError::with_context("reading /proc/stat", e))?;
        let tps = procfs::ticks_per_second() as f64;

        let cpus = stat
            .cpu_time
            .iter()
            .enumerate()
            .map(|(cpu, t)| CpuSeconds {
                cpu,
                user: secs(t.user, tps),
                nice: secs(t.nice, tps),
                system: secs(t.system, tps),
                idle: secs(t.idle, tps),
                iowait: t.iowait.map(|v| secs(v, tps)),
                irq: t.irq.map(|v| secs(v, tps)),
                softirq: t.softirq.map(|v| secs(v, tps)),
                steal: t.steal.map(|v| secs(v, tps)),
            })
            .collect();

        let counters = KernelCounters {
            boot_time: stat.btime,
            context_switches: stat.ctxt,
            forks: stat.processes,
            procs_running: stat.procs_running,
            procs_blocked: stat.procs_blocked,
        };

        Ok((cpus, counters))
    }

    /// Every block device in `/proc/diskstats`.
    pub fn disk_stats() -> Result<Vec<DiskCounters>, CollectionError> {
        let disks = procfs::diskstats()
            .map_err(|e| CollectionError::with_context("reading /proc/diskstats", e))?;

        Ok(disks
            .into_iter()
            .map(|d| DiskCounters {
                device: d.name,
                reads: d.reads,
                sectors_read: d.sectors_read,
                read_ms: d.time_reading,
                writes: d.writes,
                sectors_written: d.sectors_written,
                write_ms: d.time_writing,
                in_progress: d.in_progress,
                io_ms: d.time_in_progress,
            })
            .collect())
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use super::*;

    fn unsupported() -> CollectionError {
        CollectionError::unavailable("procfs is only available on Linux")
    }

    pub fn kernel_stats() -> Result<(Vec<CpuSeconds>, KernelCounters), CollectionError> {
        Err(unsupported())
    }

    pub fn disk_stats() -> Result<Vec<DiskCounters>, CollectionError> {
        Err(unsupported())
    }
}

pub use imp::{disk_stats, kernel_stats};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_modes_skip_missing() {
        let cpu = CpuSeconds {
            cpu: 0,
            user: 1.0,
            nice: 0.0,
            system: 2.0,
            idle: 3.0,
            iowait: Some(0.5),
            ..Default::default()
        };
        let modes: Vec<_> = cpu.modes().into_iter().map(|(m, _)| m).collect();
        assert_eq!(modes, vec!["user", "nice", "system", "idle", "iowait"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_read_proc() {
        let (cpus, counters) = kernel_stats().unwrap();
        assert!(!cpus.is_empty());
        assert!(counters.boot_time > 0);
        assert!(disk_stats().is_ok());
    }
}
