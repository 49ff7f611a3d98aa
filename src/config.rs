use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::docker_repo::ContainerFilter;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub agent: AgentConfig,
    #[serde(default)]
    pub container: ContainerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Reported host name; falls back to the daemon's, then the OS host name.
    #[serde(default)]
    pub hostname: Option<String>,
    pub check_interval_ms: u64,
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
    #[serde(default = "default_cgroup_root")]
    pub cgroup_root: PathBuf,
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

fn default_cgroup_root() -> PathBuf {
    PathBuf::from("/sys/fs/cgroup")
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerConfig {
    #[serde(default = "default_cache_duration_secs")]
    pub cache_duration_secs: u64,
    #[serde(default = "default_true")]
    pub collect_network: bool,
    /// `image:<regex>` / `name:<regex>` patterns that override the blacklist.
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default = "default_max_per_message")]
    pub max_per_message: usize,
    /// How often stale network mappings and image names are pruned.
    #[serde(default = "default_invalidation_interval_secs")]
    pub invalidation_interval_secs: u64,
    #[serde(default = "default_docker_socket")]
    pub docker_socket: PathBuf,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            cache_duration_secs: default_cache_duration_secs(),
            collect_network: true,
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            max_per_message: default_max_per_message(),
            invalidation_interval_secs: default_invalidation_interval_secs(),
            docker_socket: default_docker_socket(),
        }
    }
}

fn default_cache_duration_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_max_per_message() -> usize {
    100
}

fn default_invalidation_interval_secs() -> u64 {
    300
}

fn default_docker_socket() -> PathBuf {
    PathBuf::from("/var/run/docker.sock")
}

impl ContainerConfig {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_secs)
    }

    pub fn invalidation_interval(&self) -> Duration {
        Duration::from_secs(self.invalidation_interval_secs)
    }

    pub fn filter(&self) -> anyhow::Result<ContainerFilter> {
        Ok(ContainerFilter::new(&self.whitelist, &self.blacklist)?)
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("read config {}: {}", path, e))?;
        let mut config: AppConfig = toml::from_str(&s)?;
        config.apply_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests). Environment
    /// overrides are not applied.
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// `HOST_PROC`, `HOST_SYS` and `DOCKER_SOCKET_PATH` point the agent at the host
    /// when it runs inside a container.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(proc_root) = lookup("HOST_PROC") {
            self.agent.proc_root = PathBuf::from(proc_root);
        }
        if let Some(sys_root) = lookup("HOST_SYS") {
            self.agent.cgroup_root = PathBuf::from(sys_root).join("fs/cgroup");
        }
        if let Some(socket) = lookup("DOCKER_SOCKET_PATH") {
            self.container.docker_socket = PathBuf::from(socket);
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.agent.check_interval_ms > 0,
            "agent.check_interval_ms must be > 0, got {}",
            self.agent.check_interval_ms
        );
        anyhow::ensure!(
            self.agent.hostname.as_deref() != Some(""),
            "agent.hostname must be non-empty when set"
        );
        anyhow::ensure!(
            self.container.max_per_message > 0,
            "container.max_per_message must be > 0, got {}",
            self.container.max_per_message
        );
        anyhow::ensure!(
            self.container.invalidation_interval_secs > 0,
            "container.invalidation_interval_secs must be > 0, got {}",
            self.container.invalidation_interval_secs
        );
        self.container
            .filter()
            .map_err(|e| anyhow::anyhow!("container.whitelist/blacklist: {}", e))?;
        Ok(())
    }
}
