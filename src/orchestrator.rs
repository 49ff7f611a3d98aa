// Best-effort orchestrator metadata, looked up once per check run

use crate::models::{EcsMeta, KubernetesMeta};

pub trait MetadataSource: Send + Sync {
    fn kubernetes(&self) -> Option<KubernetesMeta>;
    fn ecs(&self) -> Option<EcsMeta>;
}

fn kubernetes_from(lookup: impl Fn(&str) -> Option<String>) -> Option<KubernetesMeta> {
    lookup("KUBERNETES_SERVICE_HOST")?;
    Some(KubernetesMeta {
        node_name: lookup("NODE_NAME").or_else(|| lookup("KUBERNETES_NODE_NAME")),
        namespace: lookup("POD_NAMESPACE"),
    })
}

fn ecs_from(lookup: impl Fn(&str) -> Option<String>) -> Option<EcsMeta> {
    let metadata_uri = lookup("ECS_CONTAINER_METADATA_URI_V4")
        .or_else(|| lookup("ECS_CONTAINER_METADATA_URI"))?;
    Some(EcsMeta {
        metadata_uri,
        cluster: lookup("ECS_CLUSTER"),
    })
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Detects Kubernetes and ECS from the agent's environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvMetadata;

impl MetadataSource for EnvMetadata {
    fn kubernetes(&self) -> Option<KubernetesMeta> {
        kubernetes_from(env_var)
    }

    fn ecs(&self) -> Option<EcsMeta> {
        ecs_from(env_var)
    }
}
