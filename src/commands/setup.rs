use std::path::PathBuf;

use clap::Args;
use log::info;

use crate::{
    types::Result,
    OptProcess,
    Relax,
};


#[derive(Debug, Args)]
/// Write VASP input (INCAR, KPOINTS, POSCAR, POTCAR) for configurations.
///
/// Templates are taken from `settings/calctype.<CALCTYPE>/` of the project,
/// configuration specific templates in `<configdir>/settings/calctype.<CALCTYPE>/`
/// take precedence.
pub struct Setup {
    #[arg(default_value = ".", num_args(1..))]
    /// Configuration directories
    configdirs: Vec<PathBuf>,

    #[arg(short = 'c', long, default_value = "default")]
    /// Calculation type, selects `settings/calctype.<CALCTYPE>`
    calctype: String,
}


impl OptProcess for Setup {
    fn process(&self) -> Result<()> {
        for configdir in self.configdirs.iter() {
            let relax = Relax::new(configdir, &self.calctype)?;
            relax.setup()?;
            info!("{}: input written to {:?}", relax.configname(), relax.calcdir());
        }
        Ok(())
    }
}
