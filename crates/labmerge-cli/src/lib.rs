//! Library half of the `labmerge` binary: logging setup, configuration and
//! the staged merge pipeline.

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod types;
