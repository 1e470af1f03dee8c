//! CLI command modules

pub mod analyze;
pub mod classify;

pub use analyze::execute_analyze_command;
pub use classify::execute_classify_command;
