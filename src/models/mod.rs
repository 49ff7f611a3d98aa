// Domain models

mod container;
mod report;
mod system;

pub use container::{
    CgroupIoStat, CgroupMemStat, CgroupTimesStat, Container, ContainerMeta, LiveSample,
    NULL_CONTAINER, NetworkStat,
};
pub use report::{CollectorContainer, ContainerHealth, ContainerReport, ContainerState};
pub use system::{CpuTimes, EcsMeta, KubernetesMeta, SystemInfo};
