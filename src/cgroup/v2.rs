// cgroup v2 (unified hierarchy) reader

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use super::{CgroupError, CgroupHandle, CgroupMap, CgroupReader};
use crate::models::{CgroupIoStat, CgroupMemStat, CgroupTimesStat};
use crate::procfs_repo::ProcFs;

/// Microseconds per USER_HZ tick.
const USEC_PER_TICK: u64 = 10_000;

/// Container id from the last segment of a cgroup path, e.g. `docker-<id>.scope`,
/// `cri-containerd-<id>.scope` or a bare `<id>`.
fn container_id_from_path(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next()?;
    let segment = segment.strip_suffix(".scope").unwrap_or(segment);
    let id = segment.rsplit('-').next()?;
    (id.len() == 64 && id.bytes().all(|b| b.is_ascii_hexdigit())).then_some(id)
}

fn read_file(path: &Path) -> Result<String, CgroupError> {
    std::fs::read_to_string(path).map_err(|source| CgroupError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_u64(path: &Path, value: &str) -> Result<u64, CgroupError> {
    value.trim().parse().map_err(|e| CgroupError::Parse {
        path: path.to_path_buf(),
        detail: format!("'{}': {}", value.trim(), e),
    })
}

/// `key value` lines; unparsable values are skipped.
fn key_values(content: &str) -> HashMap<&str, u64> {
    content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(' ')?;
            Some((key, value.trim().parse().ok()?))
        })
        .collect()
}

#[derive(Debug)]
struct V2Cgroup {
    container_id: String,
    dir: PathBuf,
    pids: Vec<u32>,
}

impl V2Cgroup {
    fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl CgroupHandle for V2Cgroup {
    fn container_id(&self) -> &str {
        &self.container_id
    }

    fn pids(&self) -> &[u32] {
        &self.pids
    }

    fn cpu_limit(&self) -> Result<f64, CgroupError> {
        // "<quota> <period>" or "max <period>"
        let path = self.file("cpu.max");
        let content = read_file(&path)?;
        let mut fields = content.split_whitespace();
        let quota = fields.next().unwrap_or("max");
        if quota == "max" {
            return Ok(0.0);
        }
        let quota = parse_u64(&path, quota)?;
        let period = parse_u64(&path, fields.next().unwrap_or(""))?;
        if period == 0 {
            return Ok(0.0);
        }
        Ok(quota as f64 / period as f64 * 100.0)
    }

    fn mem_limit(&self) -> Result<u64, CgroupError> {
        let path = self.file("memory.max");
        let content = read_file(&path)?;
        if content.trim() == "max" {
            return Ok(0);
        }
        parse_u64(&path, &content)
    }

    fn cpu(&self) -> Result<CgroupTimesStat, CgroupError> {
        let path = self.file("cpu.stat");
        let content = read_file(&path)?;
        let stats = key_values(&content);
        let field = |key: &str| {
            stats.get(key).copied().ok_or_else(|| CgroupError::Parse {
                path: path.clone(),
                detail: format!("missing {}", key),
            })
        };
        Ok(CgroupTimesStat {
            user: field("user_usec")? / USEC_PER_TICK,
            system: field("system_usec")? / USEC_PER_TICK,
        })
    }

    fn mem(&self) -> Result<CgroupMemStat, CgroupError> {
        let content = read_file(&self.file("memory.stat"))?;
        let stats = key_values(&content);
        let current = self.file("memory.current");
        let usage = parse_u64(&current, &read_file(&current)?)?;
        Ok(CgroupMemStat {
            rss: stats.get("anon").copied().unwrap_or(0),
            cache: stats.get("file").copied().unwrap_or(0),
            usage,
        })
    }

    fn io(&self) -> Result<CgroupIoStat, CgroupError> {
        // "8:0 rbytes=90112 wbytes=0 rios=6 wios=0 dbytes=0 dios=0"
        let path = self.file("io.stat");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            // io controller not enabled for this subtree
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CgroupIoStat::default()),
            Err(source) => return Err(CgroupError::Io { path, source }),
        };
        let mut stat = CgroupIoStat::default();
        for line in content.lines() {
            for kv in line.split_whitespace().skip(1) {
                match kv.split_once('=') {
                    Some(("rbytes", v)) => stat.read_bytes += parse_u64(&path, v)?,
                    Some(("wbytes", v)) => stat.write_bytes += parse_u64(&path, v)?,
                    _ => {}
                }
            }
        }
        Ok(stat)
    }

    fn start_time(&self) -> Result<i64, CgroupError> {
        let io_err = |source| CgroupError::Io {
            path: self.dir.clone(),
            source,
        };
        let modified = std::fs::metadata(&self.dir)
            .and_then(|m| m.modified())
            .map_err(io_err)?;
        let secs = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

/// Maps host pids to container cgroups through /proc/<pid>/cgroup.
#[derive(Debug, Clone)]
pub struct CgroupV2Reader {
    procfs: ProcFs,
    root: PathBuf,
}

impl CgroupV2Reader {
    pub fn new(procfs: ProcFs, root: impl Into<PathBuf>) -> Self {
        Self {
            procfs,
            root: root.into(),
        }
    }
}

impl CgroupReader for CgroupV2Reader {
    fn cgroups_for_pids(&self, pids: &[u32]) -> Result<CgroupMap, CgroupError> {
        if !self.root.is_dir() {
            return Err(CgroupError::Io {
                path: self.root.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        let mut by_container: HashMap<String, V2Cgroup> = HashMap::new();
        for &pid in pids {
            // Processes exit between listing and reading; those are skipped.
            let Ok(cgroups) = self.procfs.process(pid).and_then(|p| p.cgroups()) else {
                continue;
            };
            let Some(path) = cgroups
                .0
                .into_iter()
                .find(|cg| cg.hierarchy == 0)
                .map(|cg| cg.pathname)
            else {
                continue;
            };
            let Some(id) = container_id_from_path(&path) else {
                continue;
            };
            by_container
                .entry(id.to_string())
                .or_insert_with(|| V2Cgroup {
                    container_id: id.to_string(),
                    dir: self.root.join(path.trim_start_matches('/')),
                    pids: Vec::new(),
                })
                .pids
                .push(pid);
        }

        Ok(by_container
            .into_iter()
            .map(|(id, mut cgroup)| {
                cgroup.pids.sort_unstable();
                (id, Arc::new(cgroup) as Arc<dyn CgroupHandle>)
            })
            .collect())
    }
}
