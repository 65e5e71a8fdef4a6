//! Analysis engine, batch worker protocol and the CLI pipeline

pub mod engine;
pub mod orchestrator;
pub mod worker;

pub use engine::Engine;
pub use orchestrator::{run, PipelineResult};
pub use worker::{AnalysisRequest, AnalysisResponse, WorkerPool};
