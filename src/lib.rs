pub mod commands;
pub mod patch;
pub mod targets;
pub mod telemetry;
pub mod utils;
