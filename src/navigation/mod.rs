//! Navigation orchestration.
//!
//! - `request`: immutable requests and their precondition checks
//! - `result`: result classification and the outcome returned to callers
//! - `strategy`: the primary / fallback / emergency chain
//! - `breaker`: consecutive-failure health signal
//! - `orchestrator`: ties the above to the session, validation and history
//!   stores

pub mod breaker;
pub mod orchestrator;
pub mod request;
pub mod result;
pub mod stats;
pub mod strategy;

pub use breaker::CircuitBreaker;
pub use orchestrator::{default_strategies, DebugSnapshot, NavigationOrchestrator};
pub use request::NavigationRequest;
pub use result::{reference_code, NavigationOutcome, NavigationResult, StrategyAttempt, StrategyKind};
pub use stats::{NavigationStats, NavigationStatsSnapshot};
pub use strategy::{
    EmergencyStrategy, FallbackStrategy, NavigationStrategy, PrimaryStrategy, StrategyOutcome,
};
