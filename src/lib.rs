// Library for tests to access modules

pub mod cgroup;
pub mod check;
pub mod config;
pub mod docker_repo;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod procfs_repo;
pub mod rates;
pub mod snapshot;
pub mod sysinfo_repo;
pub mod version;
pub mod worker;
