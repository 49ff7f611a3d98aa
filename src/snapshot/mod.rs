// Correlated container list (runtime metadata + cgroup linkage), cached for a short TTL,
// with live cgroup and network metrics re-read on every call.

mod cache;

pub use cache::{MemoryCache, TtlCache};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::cgroup::{CgroupError, CgroupHandle, CgroupReader};
use crate::docker_repo::DockerRepo;
use crate::error::CollectError;
use crate::models::{Container, ContainerMeta, LiveSample, NetworkStat};
use crate::procfs_repo::{NetworkError, ProcFs, collect_network_stats};

const CACHE_KEY: &str = "container_agent.containers";

/// Source of live host process ids.
#[async_trait]
pub trait ProcessLister: Send + Sync {
    async fn pids(&self) -> anyhow::Result<Vec<u32>>;
}

/// Identity, limits and cgroup linkage of a container. Never mutated once cached.
#[derive(Debug, Clone)]
pub struct CorrelatedBase {
    pub meta: ContainerMeta,
    pub cpu_limit: f64,
    pub mem_limit: u64,
    pub cgroup: Arc<dyn CgroupHandle>,
}

impl CorrelatedBase {
    pub fn with_sample(&self, sample: LiveSample) -> Container {
        Container {
            meta: self.meta.clone(),
            cpu_limit: self.cpu_limit,
            mem_limit: self.mem_limit,
            sample,
        }
    }
}

pub type Snapshot = Arc<Vec<CorrelatedBase>>;

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("cgroup {what}: {source}")]
    Cgroup {
        what: &'static str,
        #[source]
        source: CgroupError,
    },
    #[error("network stats: {0}")]
    Network(#[from] NetworkError),
}

fn cgroup_read<T>(what: &'static str, r: Result<T, CgroupError>) -> Result<T, SampleError> {
    r.map_err(|source| SampleError::Cgroup { what, source })
}

pub struct SnapshotterConfig {
    pub cache_ttl: Duration,
    pub collect_network: bool,
    pub procfs: ProcFs,
}

pub struct Snapshotter {
    docker: Arc<DockerRepo>,
    cgroups: Arc<dyn CgroupReader>,
    processes: Arc<dyn ProcessLister>,
    cache: Arc<dyn TtlCache<Snapshot>>,
    cache_ttl: Duration,
    collect_network: bool,
    procfs: ProcFs,
}

impl Snapshotter {
    pub fn new(
        docker: Arc<DockerRepo>,
        cgroups: Arc<dyn CgroupReader>,
        processes: Arc<dyn ProcessLister>,
        cache: Arc<dyn TtlCache<Snapshot>>,
        config: SnapshotterConfig,
    ) -> Self {
        Self {
            docker,
            cgroups,
            processes,
            cache,
            cache_ttl: config.cache_ttl,
            collect_network: config.collect_network,
            procfs: config.procfs,
        }
    }

    /// All containers with fresh metrics. Per-container read failures drop only that
    /// container; failures to list processes, cgroups or containers abort the call.
    #[instrument(skip(self), fields(operation = "containers"))]
    pub async fn containers(&self) -> Result<Vec<Container>, CollectError> {
        let bases = match self.cache.get(CACHE_KEY) {
            Some(bases) => bases,
            None => {
                let bases: Snapshot = Arc::new(self.correlate().await?);
                self.cache
                    .set_with_ttl(CACHE_KEY, bases.clone(), self.cache_ttl);
                bases
            }
        };

        let mut containers = Vec::with_capacity(bases.len());
        for base in bases.iter() {
            match self.live_sample(base) {
                Ok(sample) => containers.push(base.with_sample(sample)),
                Err(e) => debug!(container_id = %base.meta.id, error = %e, "skipping container"),
            }
        }
        Ok(containers)
    }

    /// Match listed containers with their cgroups and read static limits.
    async fn correlate(&self) -> Result<Vec<CorrelatedBase>, CollectError> {
        let pids = self
            .processes
            .pids()
            .await
            .map_err(|e| CollectError::Processes(e.to_string()))?;
        let mut cgroups = self.cgroups.cgroups_for_pids(&pids)?;
        let metas = self.docker.list_containers().await?;

        let mut bases = Vec::with_capacity(metas.len());
        for meta in metas {
            // Just-created containers may not have a populated cgroup yet.
            let Some(cgroup) = cgroups.remove(&meta.id) else {
                debug!(container_id = %meta.id, "no cgroup for container, skipping");
                continue;
            };
            let cpu_limit = cgroup.cpu_limit().unwrap_or_else(|e| {
                debug!(container_id = %meta.id, error = %e, "cgroup cpu limit");
                0.0
            });
            let mem_limit = cgroup.mem_limit().unwrap_or_else(|e| {
                debug!(container_id = %meta.id, error = %e, "cgroup memory limit");
                0
            });
            bases.push(CorrelatedBase {
                meta,
                cpu_limit,
                mem_limit,
                cgroup,
            });
        }
        Ok(bases)
    }

    fn live_sample(&self, base: &CorrelatedBase) -> Result<LiveSample, SampleError> {
        let cgroup = &base.cgroup;
        let memory = cgroup_read("memory", cgroup.mem())?;
        let cpu = cgroup_read("cpu", cgroup.cpu())?;
        let io = cgroup_read("i/o", cgroup.io())?;

        let network = match (self.network_mappings(&base.meta.id), cgroup.pids().first()) {
            (Some(networks), Some(&pid)) => {
                collect_network_stats(&self.procfs, &base.meta.id, pid, &networks)?
            }
            _ => NetworkStat::default(),
        };

        let started_at = cgroup_read("start time", cgroup.start_time())?;
        Ok(LiveSample {
            cpu,
            memory,
            io,
            network,
            started_at,
            pids: cgroup.pids().to_vec(),
        })
    }

    fn network_mappings(&self, id: &str) -> Option<Vec<crate::procfs_repo::NetworkMapping>> {
        if !self.collect_network {
            return None;
        }
        self.docker.network_mappings(id)
    }
}
