//! Application layer - engine assembly and runtime orchestration.

mod engine;
mod orchestrator;

pub use engine::Engine;
pub use orchestrator::App;
