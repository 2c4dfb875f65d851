pub mod driver;
pub mod orchestrator;
