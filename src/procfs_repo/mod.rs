// Host procfs access rooted at a configurable mount point (e.g. /host/proc in a container)

mod net_dev;
mod route;

pub use net_dev::{NetworkError, collect_network_stats};
pub use route::{NetworkMapping, find_container_networks, parse_gateway};

use std::path::{Path, PathBuf};

use procfs::process::Process;

#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<pid>`
    pub fn pid_path(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }

    /// Open `pid` under this root; fails when the process directory is gone.
    pub fn process(&self, pid: u32) -> procfs::ProcResult<Process> {
        Process::new_with_root(self.pid_path(pid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_path_is_under_root() {
        let fs = ProcFs::new("/host/proc");
        assert_eq!(fs.pid_path(42), PathBuf::from("/host/proc/42"));
    }

    #[test]
    fn process_opens_pid_directory_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("42")).unwrap();
        let fs = ProcFs::new(dir.path());
        assert_eq!(fs.process(42).unwrap().pid(), 42);
        assert!(fs.process(43).is_err());
    }
}
