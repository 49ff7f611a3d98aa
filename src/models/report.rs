// Transport-facing container report and message group

use serde::{Deserialize, Serialize};

use super::{EcsMeta, KubernetesMeta, SystemInfo};

/// Docker container state; serializes to lowercase JSON (e.g. "running").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Running,
    Exited,
    Paused,
    Restarting,
    Created,
    Dead,
    #[serde(other)]
    Unknown,
}

impl ContainerState {
    /// Parse from Docker API state string (e.g. "running", "exited").
    pub fn from_docker(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "running" => ContainerState::Running,
            "exited" => ContainerState::Exited,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "created" => ContainerState::Created,
            "dead" => ContainerState::Dead,
            _ => ContainerState::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerHealth {
    Starting,
    Healthy,
    Unhealthy,
    #[serde(other)]
    Unknown,
}

impl ContainerHealth {
    /// Parse the word captured from a `(health: <word>)` status suffix.
    pub fn from_docker(s: &str) -> Self {
        match s {
            "starting" => ContainerHealth::Starting,
            "healthy" => ContainerHealth::Healthy,
            "unhealthy" => ContainerHealth::Unhealthy,
            _ => ContainerHealth::Unknown,
        }
    }
}

/// Rates for one container between two cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerReport {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: String,
    pub name: String,
    pub image: String,
    pub cpu_limit: f32,
    pub user_pct: f32,
    pub system_pct: f32,
    pub total_pct: f32,
    pub memory_limit: u64,
    pub mem_rss: u64,
    pub mem_cache: u64,
    pub created: i64,
    pub started_at: i64,
    pub state: ContainerState,
    pub health: ContainerHealth,
    pub rbps: f32,
    pub wbps: f32,
    pub net_rcvd_ps: f32,
    pub net_sent_ps: f32,
    pub net_rcvd_bps: f32,
    pub net_sent_bps: f32,
}

/// One size-bounded group of container reports, ready for transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorContainer {
    pub host_name: String,
    pub info: SystemInfo,
    pub containers: Vec<ContainerReport>,
    pub group_id: i32,
    pub group_size: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsMeta>,
}
