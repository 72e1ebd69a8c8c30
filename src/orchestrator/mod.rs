//! 编排模块：快照命中判断、数据源并发拉取、标准化与合并
pub mod orchestrator;
pub mod report;

pub use self::orchestrator::{Orchestrator, OrchestratorBuilder};
pub use self::report::{AdapterReport, AdapterStatus, DatasetOrigin, RunOutcome, RunReport};
