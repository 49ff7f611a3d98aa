// Cycle-aborting failures: a whole source is unusable

use crate::cgroup::CgroupError;
use crate::docker_repo::RuntimeError;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("could not get pids: {0}")]
    Processes(String),
    #[error("could not get cgroups for pids: {0}")]
    Cgroups(#[from] CgroupError),
    #[error("could not get docker containers: {0}")]
    ListContainers(#[from] RuntimeError),
    #[error("could not read cpu times: {0}")]
    CpuTimes(#[source] procfs::ProcError),
}
