//! Planning and executing repairs for detected issues.

pub mod coordinator;
pub mod operations;
pub mod session;
pub mod strategies;
pub mod types;

pub use coordinator::{ProgressCallback, QuickCheck, RecoveryCoordinator};
pub use operations::{OperationOutcome, OperationRunner};
pub use session::{SessionEvent, SessionLifecycle};
pub use strategies::{RecoveryStrategy, StrategyContext, StrategyOutcome, StrategyRegistry};
pub use types::{
    DataLossRisk, MaxDataLoss, RecoveryAction, RecoveryError, RecoveryOperation, RecoveryOptions, RecoveryPlan,
    RecoveryPriority, RecoveryProgress, RecoveryRecommendation, RecoveryResult, RecoverySession, SessionPhase,
    StrategyKind,
};
