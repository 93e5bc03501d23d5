pub mod config;
pub mod dispatch;
pub mod engine;
pub mod environment;
pub mod io;
pub mod presence;
pub mod runtime;
pub mod telemetry;
pub mod types;
