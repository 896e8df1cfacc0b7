pub mod factory;
pub mod orchestrator;
pub mod processor;
pub mod settings;
pub mod staging;
