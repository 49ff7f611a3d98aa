// Runtime API seam and its bollard-backed implementation

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{InspectContainerOptions, ListContainersOptions};
use bollard::models::ContainerSummary;
use tracing::debug;

/// Seconds before a request to the Docker daemon is abandoned.
const DOCKER_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("docker not available")]
    NotAvailable,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("docker api: {0}")]
    Api(String),
}

impl RuntimeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::NotFound(_))
    }
}

impl From<bollard::errors::Error> for RuntimeError {
    fn from(e: bollard::errors::Error) -> Self {
        match e {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => RuntimeError::NotFound(message),
            other => RuntimeError::Api(other.to_string()),
        }
    }
}

/// One entry of a container listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeContainer {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub image_id: String,
    pub created: i64,
    pub state: String,
    pub status: String,
    /// Network name to gateway; `None` when the daemon reports no network settings.
    pub network_gateways: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageInspect {
    pub repo_tags: Vec<String>,
    pub repo_digests: Vec<String>,
}

#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Running containers, unfiltered.
    async fn list_containers(&self) -> Result<Vec<RuntimeContainer>, RuntimeError>;
    /// Pid of the container's init process.
    async fn inspect_pid(&self, id: &str) -> Result<i64, RuntimeError>;
    async fn inspect_image(&self, image: &str) -> Result<ImageInspect, RuntimeError>;
    /// Daemon host name.
    async fn server_name(&self) -> Result<String, RuntimeError>;
}

pub struct DockerClient {
    docker: Docker,
}

impl DockerClient {
    /// Connect to the daemon socket and settle on the daemon's API version.
    /// Returns `NotAvailable` when the socket is missing.
    pub async fn connect(socket: &Path) -> Result<Self, RuntimeError> {
        if !socket.exists() {
            return Err(RuntimeError::NotAvailable);
        }
        let docker = Docker::connect_with_unix(
            &socket.to_string_lossy(),
            DOCKER_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )?;
        // Older daemons reject requests made with a newer API version.
        let docker = docker.negotiate_version().await?;
        let client = Self { docker };
        let (major, minor) = client.api_version();
        debug!(socket = %socket.display(), api_major = major, api_minor = minor, "connected to docker");
        Ok(client)
    }

    /// API version used for requests, `(major, minor)`.
    pub fn api_version(&self) -> (usize, usize) {
        let version = self.docker.client_version();
        (version.major_version, version.minor_version)
    }
}

fn from_summary(c: ContainerSummary) -> RuntimeContainer {
    RuntimeContainer {
        id: c.id.unwrap_or_default(),
        names: c.names.unwrap_or_default(),
        image: c.image.unwrap_or_default(),
        image_id: c.image_id.unwrap_or_default(),
        created: c.created.unwrap_or_default(),
        state: c.state.map(|s| s.to_string()).unwrap_or_default(),
        status: c.status.unwrap_or_default(),
        network_gateways: c.network_settings.and_then(|n| n.networks).map(|networks| {
            networks
                .into_iter()
                .map(|(name, endpoint)| (name, endpoint.gateway.unwrap_or_default()))
                .collect()
        }),
    }
}

#[async_trait]
impl RuntimeClient for DockerClient {
    async fn list_containers(&self) -> Result<Vec<RuntimeContainer>, RuntimeError> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::default()))
            .await?;
        Ok(containers.into_iter().map(from_summary).collect())
    }

    async fn inspect_pid(&self, id: &str) -> Result<i64, RuntimeError> {
        let inspect = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        Ok(inspect.state.and_then(|s| s.pid).unwrap_or_default())
    }

    async fn inspect_image(&self, image: &str) -> Result<ImageInspect, RuntimeError> {
        let inspect = self.docker.inspect_image(image).await?;
        Ok(ImageInspect {
            repo_tags: inspect.repo_tags.unwrap_or_default(),
            repo_digests: inspect.repo_digests.unwrap_or_default(),
        })
    }

    async fn server_name(&self) -> Result<String, RuntimeError> {
        let info = self.docker.info().await?;
        Ok(info.name.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use bollard::models::{ContainerSummaryNetworkSettings, EndpointSettings};

    #[tokio::test]
    async fn connect_missing_socket_is_not_available() {
        let err = DockerClient::connect(Path::new("/nonexistent/docker.sock"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RuntimeError::NotAvailable));
    }

    #[test]
    fn not_found_response_maps_to_not_found() {
        let e = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such image".into(),
        };
        assert!(RuntimeError::from(e).is_not_found());

        let e = bollard::errors::Error::DockerResponseServerError {
            status_code: 500,
            message: "boom".into(),
        };
        assert!(!RuntimeError::from(e).is_not_found());
    }

    #[test]
    fn summary_conversion_keeps_gateways() {
        let mut networks = HashMap::new();
        networks.insert(
            "bridge".to_string(),
            EndpointSettings {
                gateway: Some("172.17.0.1".into()),
                ..Default::default()
            },
        );
        let summary = ContainerSummary {
            id: Some("abc".into()),
            names: Some(vec!["/web".into()]),
            image: Some("nginx:latest".into()),
            status: Some("Up 5 seconds".into()),
            network_settings: Some(ContainerSummaryNetworkSettings {
                networks: Some(networks),
                ..Default::default()
            }),
            ..Default::default()
        };
        let c = from_summary(summary);
        assert_eq!(c.id, "abc");
        assert_eq!(c.names, vec!["/web".to_string()]);
        let gateways = c.network_gateways.unwrap();
        assert_eq!(gateways.get("bridge").map(String::as_str), Some("172.17.0.1"));
    }

    #[test]
    fn summary_without_network_settings_has_no_gateways() {
        let c = from_summary(ContainerSummary::default());
        assert!(c.network_gateways.is_none());
        assert!(c.id.is_empty());
    }
}
