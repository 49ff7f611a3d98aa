// Container check: one collection cycle per call, rates against the previous cycle,
// results chunked into transport groups.

mod chunk;

pub use chunk::{chunk, group_count};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::CollectError;
use crate::models::{
    CollectorContainer, Container, ContainerHealth, ContainerReport, ContainerState, CpuTimes,
    NULL_CONTAINER, SystemInfo,
};
use crate::orchestrator::MetadataSource;
use crate::rates::{calculate_cpu_pct, calculate_rate, elapsed_secs};
use crate::snapshot::Snapshotter;
use crate::sysinfo_repo::HostStats;

pub struct ContainerCheckConfig {
    pub host_name: String,
    pub max_per_message: usize,
}

pub struct ContainerCheck {
    snapshotter: Arc<Snapshotter>,
    host: Arc<dyn HostStats>,
    metadata: Arc<dyn MetadataSource>,
    info: SystemInfo,
    host_name: String,
    max_per_message: usize,
    last_cpu_times: CpuTimes,
    last_containers: Option<Vec<Container>>,
    last_run: Option<DateTime<Utc>>,
}

impl ContainerCheck {
    pub fn new(
        snapshotter: Arc<Snapshotter>,
        host: Arc<dyn HostStats>,
        metadata: Arc<dyn MetadataSource>,
        info: SystemInfo,
        config: ContainerCheckConfig,
    ) -> Self {
        Self {
            snapshotter,
            host,
            metadata,
            info,
            host_name: config.host_name,
            max_per_message: config.max_per_message,
            last_cpu_times: CpuTimes::default(),
            last_containers: None,
            last_run: None,
        }
    }

    pub fn name(&self) -> &'static str {
        "container"
    }

    /// Collect containers and format them against the previous run. The first run
    /// only records a baseline and produces no groups.
    pub async fn run(&mut self, group_id: i32) -> Result<Vec<CollectorContainer>, CollectError> {
        let start = Instant::now();
        let cpu_times = self.host.cpu_times().map_err(CollectError::CpuTimes)?;
        let containers = self.snapshotter.containers().await?;
        let now = Utc::now();

        let Some(last_containers) = self.last_containers.take() else {
            debug!(containers = containers.len(), "first container check run, recording baseline");
            self.record_baseline(containers, cpu_times, now);
            return Ok(Vec::new());
        };

        let kubernetes = self.metadata.kubernetes();
        let ecs = self.metadata.ecs();

        let elapsed = elapsed_secs(self.last_run, now);
        let groups = group_count(containers.len(), self.max_per_message);
        let reports = fmt_containers(
            &containers,
            &last_containers,
            self.host.logical_cpus(),
            elapsed,
        );
        let messages: Vec<CollectorContainer> = chunk(reports, groups)
            .into_iter()
            .map(|containers| CollectorContainer {
                host_name: self.host_name.clone(),
                info: self.info.clone(),
                containers,
                group_id,
                group_size: groups as i32,
                kubernetes: kubernetes.clone(),
                ecs: ecs.clone(),
            })
            .collect();

        debug!(
            host_cpu_busy_ticks = cpu_times.busy().saturating_sub(self.last_cpu_times.busy()),
            host_cpu_total_ticks = cpu_times.total().saturating_sub(self.last_cpu_times.total()),
            "host cpu since last run"
        );
        let count = containers.len();
        self.record_baseline(containers, cpu_times, now);
        info!(
            containers = count,
            groups,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "collected containers"
        );
        Ok(messages)
    }

    fn record_baseline(&mut self, containers: Vec<Container>, cpu_times: CpuTimes, now: DateTime<Utc>) {
        self.last_containers = Some(containers);
        self.last_cpu_times = cpu_times;
        self.last_run = Some(now);
    }
}

/// Rates for every container against its previous sample; containers seen for the
/// first time are compared with [`NULL_CONTAINER`].
pub fn fmt_containers(
    containers: &[Container],
    last_containers: &[Container],
    num_cpus: usize,
    elapsed: f64,
) -> Vec<ContainerReport> {
    let last_by_id: HashMap<&str, &Container> =
        last_containers.iter().map(|c| (c.id(), c)).collect();

    containers
        .iter()
        .map(|ctr| {
            let last = last_by_id.get(ctr.id()).copied().unwrap_or(&NULL_CONTAINER);
            let (cur, prev) = (&ctr.sample, &last.sample);
            ContainerReport {
                type_: ctr.meta.runtime_type.clone(),
                id: ctr.meta.id.clone(),
                name: ctr.meta.name.clone(),
                image: ctr.meta.image.clone(),
                cpu_limit: ctr.cpu_limit as f32,
                user_pct: calculate_cpu_pct(cur.cpu.user, prev.cpu.user, num_cpus, elapsed),
                system_pct: calculate_cpu_pct(cur.cpu.system, prev.cpu.system, num_cpus, elapsed),
                total_pct: calculate_cpu_pct(cur.cpu.total(), prev.cpu.total(), num_cpus, elapsed),
                memory_limit: ctr.mem_limit,
                mem_rss: cur.memory.rss,
                mem_cache: cur.memory.cache,
                created: ctr.meta.created,
                started_at: cur.started_at,
                state: ContainerState::from_docker(&ctr.meta.state),
                health: ContainerHealth::from_docker(&ctr.meta.health),
                rbps: calculate_rate(cur.io.read_bytes, prev.io.read_bytes, elapsed),
                wbps: calculate_rate(cur.io.write_bytes, prev.io.write_bytes, elapsed),
                net_rcvd_ps: calculate_rate(cur.network.packets_rcvd, prev.network.packets_rcvd, elapsed),
                net_sent_ps: calculate_rate(cur.network.packets_sent, prev.network.packets_sent, elapsed),
                net_rcvd_bps: calculate_rate(cur.network.bytes_rcvd, prev.network.bytes_rcvd, elapsed),
                net_sent_bps: calculate_rate(cur.network.bytes_sent, prev.network.bytes_sent, elapsed),
            }
        })
        .collect()
}
