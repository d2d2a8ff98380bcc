//! Shared pieces of the odm command line tool.
//!
//! Argument structs, flag parsers, logger setup and the stage commands live
//! here so they can be tested without spawning the binary.

pub mod args;
pub mod commands;
pub mod logging;
pub mod parsers;

// Re-export commonly used items at the crate root for convenience
pub use args::{PartitionArgs, RunArgs, Stage1Args, Stage2Args};
pub use logging::init_logging;
pub use parsers::{merge_normalization, parse_norm_param, parse_tail};
