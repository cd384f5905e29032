use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use log::info;

use crate::{
    types::Result,
    OptProcess,
    Relax,
};


#[derive(Debug, Args)]
/// Collect relaxed structures and energies into `properties.calc.json`.
pub struct Finalize {
    #[arg(default_value = ".", num_args(1..))]
    /// Configuration directories
    configdirs: Vec<PathBuf>,

    #[arg(short = 'c', long, default_value = "default")]
    /// Calculation type, selects `settings/calctype.<CALCTYPE>`
    calctype: String,
}


impl OptProcess for Finalize {
    fn process(&self) -> Result<()> {
        for configdir in self.configdirs.iter() {
            let relax = Relax::new(configdir, &self.calctype)?;
            let props = relax.finalize()?;
            info!("{}: {} relaxation runs", relax.configname(), props.nruns);
            println!("{:<40} {} eV", relax.configname(),
                     format!("{:14.6}", props.relaxed_energy).bright_cyan());
        }
        Ok(())
    }
}
