//! Batch conversion of VIPP source trees
//!
//! Finds `.dbm` and `.frm` files, groups them into projects by directory,
//! translates the projects in parallel and records one result per output.
//!
//! # Overview
//!
//! - **Discovery**: recursive search for source files, grouped per directory
//! - **Execution**: each group runs on the worker pool with its own translations
//! - **Report**: optional `conversion_report.json` in the output directory
//!
//! # Example
//!
//! ```ignore
//! use vipp2dfa::batch::BatchRunner;
//! use vipp2dfa::config::load_config;
//!
//! let config = load_config(None)?;
//! let records = BatchRunner::new(config).run_directory(Path::new("jobs"))?;
//! println!("{} files converted", records.len());
//! ```

pub mod discovery;
pub mod report;
pub mod result;
pub mod runner;

pub use discovery::*;
pub use report::*;
pub use result::*;
pub use runner::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::structure::LoadError;

/// Error type for batch and single-file conversion runs
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid discovery pattern '{pattern}': {source}")]
    Discovery {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Cannot convert standalone FRM file. Please provide a DBM file.")]
    StandaloneSubForm(PathBuf),

    #[error("Input not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to write conversion report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Load(#[from] LoadError),
}
