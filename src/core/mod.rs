pub mod processor;
pub mod reconcile;
pub mod run_log;
pub mod stats;
