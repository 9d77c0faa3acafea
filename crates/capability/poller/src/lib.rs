//! 轮询能力：每台设备一个采集循环，监督者按配置调和任务集合。

pub mod derive;
pub mod energy;
pub mod events;
pub mod poll;
pub mod supervisor;

pub use energy::EnergyAggregator;
pub use events::EventDetector;
pub use poll::{CycleStamp, PollerContext, run_cycle, run_device};
pub use supervisor::{Supervisor, SupervisorConfig};
