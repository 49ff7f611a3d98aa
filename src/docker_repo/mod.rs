// Docker container discovery: listing, filtering, image names and network mappings

mod client;
mod filter;
mod health;
mod image;

pub use client::{DockerClient, ImageInspect, RuntimeClient, RuntimeContainer, RuntimeError};
pub use filter::{ContainerFilter, FilterError};
pub use health::parse_container_health;
pub use image::ImageNameCache;

use crate::models::ContainerMeta;
use crate::procfs_repo::{NetworkMapping, ProcFs, find_container_networks};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// How often stale network mappings and image names are pruned.
pub const DEFAULT_INVALIDATION_INTERVAL: Duration = Duration::from_secs(5 * 60);

const RUNTIME_TYPE: &str = "Docker";

pub struct DockerRepoConfig {
    pub filter: ContainerFilter,
    pub collect_network: bool,
    pub invalidation_interval: Duration,
    pub procfs: ProcFs,
}

impl Default for DockerRepoConfig {
    fn default() -> Self {
        Self {
            filter: ContainerFilter::default(),
            collect_network: true,
            invalidation_interval: DEFAULT_INVALIDATION_INTERVAL,
            procfs: ProcFs::default(),
        }
    }
}

pub struct DockerRepo {
    client: Arc<dyn RuntimeClient>,
    filter: ContainerFilter,
    collect_network: bool,
    procfs: ProcFs,
    invalidation_interval: Duration,
    last_invalidate: Mutex<Instant>,
    network_mappings: Mutex<HashMap<String, Vec<NetworkMapping>>>,
    image_names: ImageNameCache,
}

impl DockerRepo {
    pub fn new(client: Arc<dyn RuntimeClient>, config: DockerRepoConfig) -> Self {
        Self {
            client,
            filter: config.filter,
            collect_network: config.collect_network,
            procfs: config.procfs,
            invalidation_interval: config.invalidation_interval,
            last_invalidate: Mutex::new(Instant::now()),
            network_mappings: Mutex::new(HashMap::new()),
            image_names: ImageNameCache::default(),
        }
    }

    fn mappings(&self) -> MutexGuard<'_, HashMap<String, Vec<NetworkMapping>>> {
        self.network_mappings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Running containers that pass the filter. Containers that disappear before
    /// their network mapping can be resolved are left out of this listing.
    #[instrument(skip(self), fields(repo = "docker", operation = "list_containers"))]
    pub async fn list_containers(&self) -> Result<Vec<ContainerMeta>, RuntimeError> {
        let containers = self.client.list_containers().await?;
        self.maybe_invalidate(&containers);

        let mut ret = Vec::with_capacity(containers.len());
        for c in &containers {
            let meta = ContainerMeta {
                runtime_type: RUNTIME_TYPE.to_string(),
                id: c.id.clone(),
                name: c.names.first().cloned().unwrap_or_default(),
                image: self.image_names.resolve(self.client.as_ref(), &c.image).await,
                image_id: c.image_id.clone(),
                created: c.created,
                state: c.state.clone(),
                health: parse_container_health(&c.status).to_string(),
            };
            if self.filter.is_excluded(&meta) {
                continue;
            }
            if self.collect_network && !self.ensure_network_mapping(c).await {
                continue;
            }
            ret.push(meta);
        }
        Ok(ret)
    }

    /// Resolve and cache the container's network mapping once. Returns false when
    /// the container could not be inspected.
    async fn ensure_network_mapping(&self, c: &RuntimeContainer) -> bool {
        // TODO: mappings are never refreshed if a container joins or leaves networks while running
        if self.mappings().contains_key(&c.id) {
            return true;
        }
        let pid = match self.client.inspect_pid(&c.id).await {
            Ok(pid) => pid,
            Err(e) => {
                if e.is_not_found() {
                    debug!(container_id = %c.id, error = %e, "error inspecting container");
                } else {
                    warn!(container_id = %c.id, error = %e, "error inspecting container");
                }
                return false;
            }
        };
        let pid = u32::try_from(pid).unwrap_or(0);
        let networks =
            find_container_networks(&self.procfs, &c.id, pid, c.network_gateways.as_ref());
        self.mappings().insert(c.id.clone(), networks);
        true
    }

    /// Cached network mapping for a container, if one has been resolved.
    pub fn network_mappings(&self, container_id: &str) -> Option<Vec<NetworkMapping>> {
        self.mappings().get(container_id).cloned()
    }

    fn maybe_invalidate(&self, containers: &[RuntimeContainer]) {
        {
            let mut last = self
                .last_invalidate
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if last.elapsed() < self.invalidation_interval {
                return;
            }
            *last = Instant::now();
        }
        self.invalidate_caches(containers);
    }

    /// Drop mappings and image names not referenced by `containers`.
    fn invalidate_caches(&self, containers: &[RuntimeContainer]) {
        let live_containers: HashSet<&str> = containers.iter().map(|c| c.id.as_str()).collect();
        let live_images: HashSet<&str> = containers.iter().map(|c| c.image.as_str()).collect();
        self.mappings()
            .retain(|id, _| live_containers.contains(id.as_str()));
        self.image_names.retain_live(&live_images);
        debug!(
            containers = live_containers.len(),
            images = self.image_names.len(),
            "invalidated docker caches"
        );
    }

    /// Daemon host name.
    pub async fn hostname(&self) -> Result<String, RuntimeError> {
        self.client.server_name().await
    }
}
