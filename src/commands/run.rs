use std::path::PathBuf;

use clap::Args;
use log::info;

use crate::{
    types::Result,
    relax::CommandRunner,
    OptProcess,
    Relax,
};


#[derive(Debug, Args)]
/// Run the relaxation of one configuration in the foreground.
///
/// VASP is launched with `vasp_cmd` from the settings until the structure
/// is relaxed, then a final static run is done. Calling this again resumes
/// an interrupted relaxation. Usually invoked from the job script written
/// by `vaspwrap submit`.
pub struct Run {
    #[arg(default_value = ".")]
    /// Configuration directory
    configdir: PathBuf,

    #[arg(short = 'c', long, default_value = "default")]
    /// Calculation type, selects `settings/calctype.<CALCTYPE>`
    calctype: String,
}


impl OptProcess for Run {
    fn process(&self) -> Result<()> {
        let relax = Relax::new(&self.configdir, &self.calctype)?;
        let status = relax.run(&CommandRunner)?;
        info!("{}: {}", relax.configname(), status);
        Ok(())
    }
}
