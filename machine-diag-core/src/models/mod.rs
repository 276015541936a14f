pub mod config;
pub mod diagnostic_result;
pub mod error;
pub mod recording_result;
pub mod state;
