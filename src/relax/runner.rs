use std::{
    fs::File,
    path::Path,
    process::{
        Command,
        Stdio,
    },
};

use anyhow::Context;
use log::{
    info,
    warn,
};

use crate::types::Result;


pub const STDOUT_FILE_NAME: &str = "std.out";
pub const STDERR_FILE_NAME: &str = "std.err";


/// Launches VASP in a prepared run directory.
///
/// Whether the run succeeded is judged from its OUTCAR afterwards, so an
/// implementation only reports failures to launch.
pub trait VaspRunner {
    fn run(&self, rundir: &Path, command: &str) -> Result<()>;
}


/// Runs the command through `sh -c`, output captured in `std.out` and `std.err`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner;


impl VaspRunner for CommandRunner {
    fn run(&self, rundir: &Path, command: &str) -> Result<()> {
        info!("Launching `{}` in {:?}", command, rundir);
        let stdout = File::create(rundir.join(STDOUT_FILE_NAME))?;
        let stderr = File::create(rundir.join(STDERR_FILE_NAME))?;

        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(rundir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .with_context(|| format!("Failed to launch `{}`", command))?;

        if !status.success() {
            warn!("`{}` exited with {}", command, status);
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempdir::TempDir;

    #[test]
    fn test_command_runner() -> Result<()> {
        let tmp = TempDir::new("vaspwrap_runner")?;
        CommandRunner.run(tmp.path(), "echo hello; echo oops 1>&2; touch OUTCAR; exit 3")?;
        assert_eq!(fs::read_to_string(tmp.path().join(STDOUT_FILE_NAME))?, "hello\n");
        assert_eq!(fs::read_to_string(tmp.path().join(STDERR_FILE_NAME))?, "oops\n");
        assert!(tmp.path().join("OUTCAR").is_file());
        Ok(())
    }
}
