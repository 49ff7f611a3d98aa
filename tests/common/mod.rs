// Shared test helpers: in-memory runtime, cgroups, process list and host stats

#![allow(dead_code)]

use async_trait::async_trait;
use container_agent::cgroup::{CgroupError, CgroupHandle, CgroupMap, CgroupReader};
use container_agent::docker_repo::{
    DockerRepo, DockerRepoConfig, ImageInspect, RuntimeClient, RuntimeContainer, RuntimeError,
};
use container_agent::models::{CgroupIoStat, CgroupMemStat, CgroupTimesStat, CpuTimes};
use container_agent::procfs_repo::ProcFs;
use container_agent::snapshot::{
    MemoryCache, ProcessLister, Snapshot, Snapshotter, SnapshotterConfig,
};
use container_agent::sysinfo_repo::HostStats;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn runtime_container(id: &str, name: &str, image: &str) -> RuntimeContainer {
    RuntimeContainer {
        id: id.into(),
        names: vec![name.into()],
        image: image.into(),
        created: 1_700_000_000,
        state: "running".into(),
        status: "Up 2 minutes (health: healthy)".into(),
        network_gateways: Some(BTreeMap::from([("host".to_string(), String::new())])),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct FakeRuntime {
    pub containers: Mutex<Vec<RuntimeContainer>>,
    pub pids: HashMap<String, i64>,
    pub list_calls: AtomicUsize,
    pub fail_list: AtomicBool,
}

impl FakeRuntime {
    pub fn with_containers(containers: Vec<RuntimeContainer>) -> Self {
        Self {
            containers: Mutex::new(containers),
            ..Default::default()
        }
    }
}

#[async_trait]
impl RuntimeClient for FakeRuntime {
    async fn list_containers(&self) -> Result<Vec<RuntimeContainer>, RuntimeError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(RuntimeError::Api("daemon unavailable".into()));
        }
        Ok(self.containers.lock().unwrap().clone())
    }

    async fn inspect_pid(&self, id: &str) -> Result<i64, RuntimeError> {
        Ok(self.pids.get(id).copied().unwrap_or(1))
    }

    async fn inspect_image(&self, image: &str) -> Result<ImageInspect, RuntimeError> {
        Err(RuntimeError::NotFound(image.to_string()))
    }

    async fn server_name(&self) -> Result<String, RuntimeError> {
        Ok("fake-host".into())
    }
}

/// Counters a test can move forward between cycles.
#[derive(Debug, Default, Clone)]
pub struct Counters {
    pub cpu: CgroupTimesStat,
    pub mem: CgroupMemStat,
    pub io: CgroupIoStat,
}

#[derive(Debug)]
pub struct FakeCgroup {
    pub id: String,
    pub pids: Vec<u32>,
    pub cpu_limit: Option<f64>,
    pub mem_limit: Option<u64>,
    pub counters: Mutex<Counters>,
    pub fail_cpu: AtomicBool,
    pub fail_mem: AtomicBool,
    pub fail_io: AtomicBool,
    pub fail_start: AtomicBool,
    pub started_at: i64,
}

impl FakeCgroup {
    pub fn new(id: &str, pids: Vec<u32>) -> Self {
        Self {
            id: id.into(),
            pids,
            cpu_limit: Some(200.0),
            mem_limit: Some(512 * 1024 * 1024),
            counters: Mutex::new(Counters::default()),
            fail_cpu: AtomicBool::new(false),
            fail_mem: AtomicBool::new(false),
            fail_io: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            started_at: 1_700_000_100,
        }
    }

    pub fn advance(&self, cpu_user: u64, cpu_system: u64, read_bytes: u64, write_bytes: u64) {
        let mut c = self.counters.lock().unwrap();
        c.cpu.user += cpu_user;
        c.cpu.system += cpu_system;
        c.io.read_bytes += read_bytes;
        c.io.write_bytes += write_bytes;
    }

    fn not_found(&self, file: &str) -> CgroupError {
        CgroupError::Io {
            path: PathBuf::from(format!("/sys/fs/cgroup/{}/{}", self.id, file)),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
    }
}

impl CgroupHandle for FakeCgroup {
    fn container_id(&self) -> &str {
        &self.id
    }

    fn pids(&self) -> &[u32] {
        &self.pids
    }

    fn cpu_limit(&self) -> Result<f64, CgroupError> {
        self.cpu_limit.ok_or_else(|| self.not_found("cpu.max"))
    }

    fn mem_limit(&self) -> Result<u64, CgroupError> {
        self.mem_limit.ok_or_else(|| self.not_found("memory.max"))
    }

    fn cpu(&self) -> Result<CgroupTimesStat, CgroupError> {
        if self.fail_cpu.load(Ordering::SeqCst) {
            return Err(self.not_found("cpu.stat"));
        }
        Ok(self.counters.lock().unwrap().cpu)
    }

    fn mem(&self) -> Result<CgroupMemStat, CgroupError> {
        if self.fail_mem.load(Ordering::SeqCst) {
            return Err(self.not_found("memory.stat"));
        }
        Ok(self.counters.lock().unwrap().mem)
    }

    fn io(&self) -> Result<CgroupIoStat, CgroupError> {
        if self.fail_io.load(Ordering::SeqCst) {
            return Err(self.not_found("io.stat"));
        }
        Ok(self.counters.lock().unwrap().io)
    }

    fn start_time(&self) -> Result<i64, CgroupError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(self.not_found(""));
        }
        Ok(self.started_at)
    }
}

#[derive(Default)]
pub struct FakeCgroups {
    pub cgroups: Mutex<Vec<Arc<FakeCgroup>>>,
    pub calls: AtomicUsize,
}

impl FakeCgroups {
    pub fn with(cgroups: Vec<Arc<FakeCgroup>>) -> Self {
        Self {
            cgroups: Mutex::new(cgroups),
            ..Default::default()
        }
    }
}

impl CgroupReader for FakeCgroups {
    fn cgroups_for_pids(&self, pids: &[u32]) -> Result<CgroupMap, CgroupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .cgroups
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.pids.iter().any(|p| pids.contains(p)))
            .map(|c| (c.id.clone(), c.clone() as Arc<dyn CgroupHandle>))
            .collect())
    }
}

pub struct FakeProcesses(pub Vec<u32>);

#[async_trait]
impl ProcessLister for FakeProcesses {
    async fn pids(&self) -> anyhow::Result<Vec<u32>> {
        Ok(self.0.clone())
    }
}

pub struct FakeHost {
    pub cpus: usize,
    pub times: Mutex<CpuTimes>,
    pub fail: AtomicBool,
}

impl FakeHost {
    pub fn new(cpus: usize) -> Self {
        Self {
            cpus,
            times: Mutex::new(CpuTimes::default()),
            fail: AtomicBool::new(false),
        }
    }
}

impl HostStats for FakeHost {
    fn cpu_times(&self) -> procfs::ProcResult<CpuTimes> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(procfs::ProcError::NotFound(Some(PathBuf::from("/proc/stat"))));
        }
        let mut times = self.times.lock().unwrap();
        times.user += 100;
        times.idle += 100;
        Ok(*times)
    }

    fn logical_cpus(&self) -> usize {
        self.cpus
    }
}

/// Runtime, cgroups and snapshotter wired together over fakes.
pub struct Harness {
    pub runtime: Arc<FakeRuntime>,
    pub cgroups: Arc<FakeCgroups>,
    pub snapshotter: Arc<Snapshotter>,
}

pub struct HarnessConfig {
    pub cache_ttl: Duration,
    pub collect_network: bool,
    pub procfs: ProcFs,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60),
            collect_network: false,
            procfs: ProcFs::default(),
        }
    }
}

pub fn harness(
    containers: Vec<RuntimeContainer>,
    cgroups: Vec<Arc<FakeCgroup>>,
    config: HarnessConfig,
) -> Harness {
    let pids: Vec<u32> = cgroups.iter().flat_map(|c| c.pids.clone()).collect();
    let runtime = Arc::new(FakeRuntime::with_containers(containers));
    let cgroups = Arc::new(FakeCgroups::with(cgroups));
    let docker = Arc::new(DockerRepo::new(
        runtime.clone(),
        DockerRepoConfig {
            collect_network: config.collect_network,
            procfs: config.procfs.clone(),
            ..Default::default()
        },
    ));
    let snapshotter = Arc::new(Snapshotter::new(
        docker,
        cgroups.clone(),
        Arc::new(FakeProcesses(pids)),
        Arc::new(MemoryCache::<Snapshot>::new()),
        SnapshotterConfig {
            cache_ttl: config.cache_ttl,
            collect_network: config.collect_network,
            procfs: config.procfs,
        },
    ));
    Harness {
        runtime,
        cgroups,
        snapshotter,
    }
}
