pub mod config;
pub mod state;
pub mod reader;
pub mod loader;
pub mod orders;
pub mod client;
pub mod telemetry;
