// Host process list, CPU count, CPU times and identity via sysinfo and procfs

mod linux;

use crate::models::{CpuTimes, SystemInfo};
use crate::procfs_repo::ProcFs;
use crate::snapshot::ProcessLister;
use async_trait::async_trait;
use std::sync::Arc;
use sysinfo::{ProcessesToUpdate, System};
use tracing::instrument;

/// Host-wide figures the container check needs every cycle.
pub trait HostStats: Send + Sync {
    fn cpu_times(&self) -> procfs::ProcResult<CpuTimes>;
    fn logical_cpus(&self) -> usize;
}

pub struct HostRepo {
    sys: Arc<std::sync::Mutex<System>>,
    procfs: ProcFs,
    logical_cpus: usize,
}

impl HostRepo {
    pub fn new(procfs: ProcFs) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();
        let logical_cpus = sys.cpus().len().max(1);
        Self {
            sys: Arc::new(std::sync::Mutex::new(sys)),
            procfs,
            logical_cpus,
        }
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "get_system_info"))]
    pub async fn get_system_info(&self) -> anyhow::Result<SystemInfo> {
        let sys = self.sys.clone();
        let proc_root = self.procfs.root().to_path_buf();
        tokio::task::spawn_blocking(move || {
            let sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            let processor_name = linux::read_cpu_model_linux(&proc_root)
                .or_else(|| {
                    sys.cpus()
                        .first()
                        .map(|c| c.brand().to_string())
                        .filter(|s| !s.is_empty())
                })
                .unwrap_or_else(|| "Unknown".into());
            Ok(SystemInfo {
                os_family: System::name().unwrap_or_else(|| std::env::consts::OS.into()),
                os_version: System::os_version().unwrap_or_default(),
                kernel_version: System::kernel_version().unwrap_or_default(),
                processor_name,
                physical_cores: System::physical_core_count().unwrap_or(0) as u32,
                logical_cores: sys.cpus().len() as u32,
                total_memory: sys.total_memory(),
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    /// OS host name, used when neither config nor the daemon provide one.
    pub fn host_name() -> Option<String> {
        System::host_name()
    }
}

impl HostStats for HostRepo {
    fn cpu_times(&self) -> procfs::ProcResult<CpuTimes> {
        linux::read_cpu_times(self.procfs.root())
    }

    fn logical_cpus(&self) -> usize {
        self.logical_cpus
    }
}

#[async_trait]
impl ProcessLister for HostRepo {
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "pids"))]
    async fn pids(&self) -> anyhow::Result<Vec<u32>> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
            sys.refresh_processes(ProcessesToUpdate::All, true);
            let mut pids: Vec<u32> = sys.processes().keys().map(|p| p.as_u32()).collect();
            pids.sort_unstable();
            Ok(pids)
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}
