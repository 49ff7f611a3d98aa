use anyhow::Result;
use container_agent::*;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries one JSON message group per line.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        version = version::VERSION,
        name = version::NAME,
        "Starting container agent"
    );

    let procfs = procfs_repo::ProcFs::new(&app_config.agent.proc_root);
    let host_repo = Arc::new(sysinfo_repo::HostRepo::new(procfs.clone()));
    let system_info = host_repo
        .get_system_info()
        .await
        .map_err(|e| anyhow::anyhow!("system info: {}", e))?;

    let client: Arc<dyn docker_repo::RuntimeClient> = Arc::new(
        docker_repo::DockerClient::connect(&app_config.container.docker_socket)
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "docker socket {}: {}",
                    app_config.container.docker_socket.display(),
                    e
                )
            })?,
    );

    let docker_repo = Arc::new(docker_repo::DockerRepo::new(
        client,
        docker_repo::DockerRepoConfig {
            filter: app_config.container.filter()?,
            collect_network: app_config.container.collect_network,
            invalidation_interval: app_config.container.invalidation_interval(),
            procfs: procfs.clone(),
        },
    ));
    let host_name = match app_config.agent.hostname.clone() {
        Some(name) => name,
        None => match docker_repo.hostname().await {
            Ok(name) if !name.is_empty() => name,
            Ok(_) => sysinfo_repo::HostRepo::host_name().unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not get host name from docker");
                sysinfo_repo::HostRepo::host_name().unwrap_or_default()
            }
        },
    };

    let cgroups = Arc::new(cgroup::CgroupV2Reader::new(
        procfs.clone(),
        &app_config.agent.cgroup_root,
    ));
    let snapshotter = Arc::new(snapshot::Snapshotter::new(
        docker_repo,
        cgroups,
        host_repo.clone(),
        Arc::new(snapshot::MemoryCache::<snapshot::Snapshot>::new()),
        snapshot::SnapshotterConfig {
            cache_ttl: app_config.container.cache_duration(),
            collect_network: app_config.container.collect_network,
            procfs,
        },
    ));
    let check = check::ContainerCheck::new(
        snapshotter,
        host_repo,
        Arc::new(orchestrator::EnvMetadata),
        system_info,
        check::ContainerCheckConfig {
            host_name: host_name.clone(),
            max_per_message: app_config.container.max_per_message,
        },
    );

    let (tx, mut rx) = mpsc::channel(worker::sender_channel_capacity(
        app_config.container.max_per_message,
    ));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            check,
            tx,
            shutdown_rx,
        },
        worker::WorkerConfig {
            check_interval_ms: app_config.agent.check_interval_ms,
        },
    );
    tracing::info!(
        host_name = %host_name,
        check_interval_ms = app_config.agent.check_interval_ms,
        "Container check running"
    );

    let printer = tokio::spawn(async move {
        while let Some(group) = rx.recv().await {
            match serde_json::to_string(&group) {
                Ok(line) => {
                    let mut stdout = std::io::stdout().lock();
                    if let Err(e) = writeln!(stdout, "{}", line) {
                        tracing::warn!(error = %e, "write message group");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "serialize message group"),
            }
        }
    });

    shutdown_signal().await;
    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;
    let _ = printer.await;

    Ok(())
}
