use std::path::PathBuf;

use clap::Args;
use log::{
    info,
    warn,
};

use crate::{
    types::Result,
    OptProcess,
    Relax,
};


#[derive(Debug, Args)]
/// Submit relaxation jobs to the batch system.
///
/// A PBS script `vaspwrap.sh` is written into the calculation directory and
/// passed to `submit_cmd` (qsub by default).
pub struct Submit {
    #[arg(default_value = ".", num_args(1..))]
    /// Configuration directories
    configdirs: Vec<PathBuf>,

    #[arg(short = 'c', long, default_value = "default")]
    /// Calculation type, selects `settings/calctype.<CALCTYPE>`
    calctype: String,

    #[arg(short = 'f', long)]
    /// Submit even if the job is already submitted, running or complete
    force: bool,
}


impl OptProcess for Submit {
    fn process(&self) -> Result<()> {
        for configdir in self.configdirs.iter() {
            let relax = Relax::new(configdir, &self.calctype)?;
            match relax.submit(self.force)? {
                Some(jobid) => info!("{}: submitted as job {}", relax.configname(), jobid),
                None => warn!("{}: submitted, but no job id was reported", relax.configname()),
            }
        }
        Ok(())
    }
}
