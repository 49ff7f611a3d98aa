// Container samples: identity, limits and live cgroup/network counters

use std::sync::LazyLock;

/// CPU time consumed by a cgroup, in hundredths of a second (USER_HZ ticks).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CgroupTimesStat {
    pub user: u64,
    pub system: u64,
}

impl CgroupTimesStat {
    pub fn total(&self) -> u64 {
        self.user.saturating_add(self.system)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CgroupMemStat {
    pub rss: u64,
    pub cache: u64,
    pub usage: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CgroupIoStat {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Interface counters summed over every interface mapped to a container network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStat {
    pub bytes_sent: u64,
    pub bytes_rcvd: u64,
    pub packets_sent: u64,
    pub packets_rcvd: u64,
}

impl std::ops::AddAssign for NetworkStat {
    fn add_assign(&mut self, rhs: Self) {
        self.bytes_sent += rhs.bytes_sent;
        self.bytes_rcvd += rhs.bytes_rcvd;
        self.packets_sent += rhs.packets_sent;
        self.packets_rcvd += rhs.packets_rcvd;
    }
}

/// Runtime metadata for one container as listed by the runtime API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerMeta {
    pub runtime_type: String,
    pub id: String,
    pub name: String,
    pub image: String,
    pub image_id: String,
    pub created: i64,
    pub state: String,
    pub health: String,
}

/// Point-in-time metrics re-read from the cgroup on every call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSample {
    pub cpu: CgroupTimesStat,
    pub memory: CgroupMemStat,
    pub io: CgroupIoStat,
    pub network: NetworkStat,
    pub started_at: i64,
    pub pids: Vec<u32>,
}

/// One observed container at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    pub meta: ContainerMeta,
    pub cpu_limit: f64,
    pub mem_limit: u64,
    pub sample: LiveSample,
}

impl Container {
    pub fn id(&self) -> &str {
        &self.meta.id
    }
}

/// Zero-valued baseline used when a container has no previous sample.
pub static NULL_CONTAINER: LazyLock<Container> = LazyLock::new(Container::default);
