// Kernel resource accounting per container: the reader seam and a cgroup v2 implementation

mod v2;

pub use v2::CgroupV2Reader;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::{CgroupIoStat, CgroupMemStat, CgroupTimesStat};

#[derive(Debug, thiserror::Error)]
pub enum CgroupError {
    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {}: {detail}", path.display())]
    Parse { path: PathBuf, detail: String },
}

/// One container's cgroup. Every read may fail independently.
pub trait CgroupHandle: Send + Sync + std::fmt::Debug {
    fn container_id(&self) -> &str;
    /// Pids seen in this cgroup when it was discovered, sorted.
    fn pids(&self) -> &[u32];
    /// CPU limit as a percentage of one core; 0 means unlimited.
    fn cpu_limit(&self) -> Result<f64, CgroupError>;
    /// Memory limit in bytes; 0 means unlimited.
    fn mem_limit(&self) -> Result<u64, CgroupError>;
    fn cpu(&self) -> Result<CgroupTimesStat, CgroupError>;
    fn mem(&self) -> Result<CgroupMemStat, CgroupError>;
    fn io(&self) -> Result<CgroupIoStat, CgroupError>;
    /// Container start, Unix seconds.
    fn start_time(&self) -> Result<i64, CgroupError>;
}

pub type CgroupMap = HashMap<String, Arc<dyn CgroupHandle>>;

pub trait CgroupReader: Send + Sync {
    /// Group `pids` by the container cgroup they belong to, keyed by container id.
    fn cgroups_for_pids(&self, pids: &[u32]) -> Result<CgroupMap, CgroupError>;
}
