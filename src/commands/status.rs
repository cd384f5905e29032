use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::{
    types::Result,
    OptProcess,
    Relax,
};


#[derive(Debug, Args)]
/// Print the status of relaxations.
pub struct Status {
    #[arg(default_value = ".", num_args(1..))]
    /// Configuration directories
    configdirs: Vec<PathBuf>,

    #[arg(short = 'c', long, default_value = "default")]
    /// Calculation type, selects `settings/calctype.<CALCTYPE>`
    calctype: String,
}


impl OptProcess for Status {
    fn process(&self) -> Result<()> {
        let mut output = String::new();
        output.push_str(&format!("{:<40} {:>16} {:>5} {:>16}\n",
                                 "Configuration".bright_green(), "Status".bright_green(),
                                 "Runs".bright_green(), "Job".bright_green()));

        for configdir in self.configdirs.iter() {
            let relax = Relax::new(configdir, &self.calctype)?;
            let record = relax.status()?;
            let nruns = relax.rundirs()?.len();
            output.push_str(&format!("{:<40} {:>16} {:>5} {:>16}\n",
                                     relax.configname(),
                                     record.status.colored(),
                                     nruns,
                                     record.jobid.as_deref().unwrap_or("-")));
        }

        print!("{}", output);
        Ok(())
    }
}
