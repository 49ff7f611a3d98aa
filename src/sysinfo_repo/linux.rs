// Linux-specific helpers: /proc/cpuinfo and /proc/stat.

use std::path::Path;

use procfs::{FromReadSI, KernelStats, ProcResult};

use crate::models::CpuTimes;

/// Read first "model name" from /proc/cpuinfo (Linux). Prefer over sysinfo when it returns "cpu0" etc.
pub(super) fn read_cpu_model_linux(proc_root: &Path) -> Option<String> {
    let content = std::fs::read_to_string(proc_root.join("cpuinfo")).ok()?;
    for line in content.lines() {
        if line.starts_with("model name") {
            let name = line
                .find(": ")
                .map(|i| line[i + 2..].trim())
                .filter(|s| !s.is_empty() && *s != "cpu0")?;
            return Some(name.to_string());
        }
    }
    None
}

/// Host-wide times from the aggregate `cpu` line of `<proc_root>/stat`.
/// Columns missing on old kernels read as 0.
pub(super) fn read_cpu_times(proc_root: &Path) -> ProcResult<CpuTimes> {
    let stats = KernelStats::from_file(proc_root.join("stat"), procfs::current_system_info())?;
    let total = stats.total;
    Ok(CpuTimes {
        user: total.user,
        nice: total.nice,
        system: total.system,
        idle: total.idle,
        iowait: total.iowait.unwrap_or(0),
        irq: total.irq.unwrap_or(0),
        softirq: total.softirq.unwrap_or(0),
        steal: total.steal.unwrap_or(0),
    })
}
