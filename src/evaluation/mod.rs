//! Turn evaluation: the evaluator, its result records, the process-wide
//! cache and cost accounting.

pub mod accounting;
mod cache;
mod evaluator;
mod pipeline;
mod result;

pub use accounting::{Ledger, StrategyTally, TelemetrySnapshot};
pub use cache::{EvaluationCache, Fingerprint};
pub use evaluator::Evaluator;
pub use pipeline::EvaluationPipeline;
pub use result::{EvaluationResult, PerformanceMetrics};
