use std::path::PathBuf;

use thiserror::Error;


/// Errors raised while handling settings or driving a relaxation.
#[derive(Debug, Error)]
pub enum VaspWrapperError {
    #[error("Missing required setting '{0}'")]
    MissingSetting(String),

    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Could not find '{name}' in any of {searched:?}")]
    MissingInputFile { name: String, searched: Vec<PathBuf> },

    #[error("Invalid {what}: {reason}")]
    Parse { what: &'static str, reason: String },

    #[error("No project root (a directory containing '.casm') above {0:?}")]
    ProjectNotFound(PathBuf),

    #[error("VASP run in {rundir:?} failed: {reason}")]
    VaspFailed { rundir: PathBuf, reason: String },

    #[error("Relaxation not converging after {0} runs")]
    NotConverging(usize),

    #[error("Job submission failed: {0}")]
    Submit(String),
}


impl VaspWrapperError {
    pub(crate) fn parse(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Parse { what, reason: reason.into() }
    }
}
