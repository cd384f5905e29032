use std::{
    fmt,
    fs,
    path::Path,
};

use anyhow::Context;
use colored::{
    ColoredString,
    Colorize,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::types::Result;


pub const STATUS_FILE_NAME: &str = "status.json";


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaxStatus {
    NotSubmitted,
    Submitted,
    Started,
    Complete,
    Failed,
    NotConverging,
}


impl RelaxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelaxStatus::NotSubmitted  => "not_submitted",
            RelaxStatus::Submitted     => "submitted",
            RelaxStatus::Started       => "started",
            RelaxStatus::Complete      => "complete",
            RelaxStatus::Failed        => "failed",
            RelaxStatus::NotConverging => "not_converging",
        }
    }

    pub fn colored(&self) -> ColoredString {
        match self {
            RelaxStatus::NotSubmitted  => self.as_str().normal(),
            RelaxStatus::Submitted     => self.as_str().bright_blue(),
            RelaxStatus::Started       => self.as_str().bright_yellow(),
            RelaxStatus::Complete      => self.as_str().bright_green(),
            RelaxStatus::Failed        => self.as_str().bright_red(),
            RelaxStatus::NotConverging => self.as_str().red(),
        }
    }

    /// A job is queued or running, or there is nothing left to do.
    pub fn is_busy_or_done(&self) -> bool {
        matches!(self, RelaxStatus::Submitted | RelaxStatus::Started | RelaxStatus::Complete)
    }
}


impl fmt::Display for RelaxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// Content of `status.json` in a calculation directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: RelaxStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobid: Option<String>,
}


impl Default for StatusRecord {
    fn default() -> Self {
        Self {
            status: RelaxStatus::NotSubmitted,
            jobid: None,
        }
    }
}


impl StatusRecord {
    /// Status stored in `calcdir`, `not_submitted` if there is none yet.
    pub fn load(calcdir: &Path) -> Result<Self> {
        let path = calcdir.join(STATUS_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let txt = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", &path))?;
        serde_json::from_str(&txt)
            .with_context(|| format!("Failed to parse {:?}", &path))
    }

    pub fn save(&self, calcdir: &Path) -> Result<()> {
        let path = calcdir.join(STATUS_FILE_NAME);
        fs::create_dir_all(calcdir)?;
        fs::write(&path, serde_json::to_string_pretty(self)? + "\n")
            .with_context(|| format!("Failed to write {:?}", &path))
    }
}
