pub mod copy_engine;
pub mod order_executor;
pub mod sizing;

pub use copy_engine::{CopyEngine, CopyEngineConfig};
pub use order_executor::{ExecPhase, ExecReport, OrderExecutor, SizeUnit};
pub use sizing::{CopyStrategyConfig, StrategyKind};
