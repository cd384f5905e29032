use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use log::info;

use crate::{
    types::Result,
    read_settings,
    settings::Settings as RelaxSettings,
    write_settings,
    OptProcess,
};


#[derive(Debug, Args)]
/// Check a settings file, or write an example one.
///
/// The settings are printed as resolved after user defaults and `VASPWRAP_*`
/// environment overrides are applied. Files ending in `.toml` are TOML,
/// everything else is JSON.
pub struct Settings {
    #[arg(default_value = "./relax.json")]
    /// Settings file
    path: PathBuf,

    #[arg(long)]
    /// Write an example settings file to PATH instead
    init: bool,

    #[arg(short = 'f', long)]
    /// Overwrite PATH when used with `--init`
    force: bool,
}


impl OptProcess for Settings {
    fn process(&self) -> Result<()> {
        if self.init {
            if self.path.exists() && !self.force {
                bail!("{:?} exists, use `--force` to overwrite it", &self.path);
            }
            write_settings(&RelaxSettings::example(), &self.path)?;
            info!("Example settings written to {:?}", &self.path);
            return Ok(());
        }

        let settings = read_settings(&self.path)?;
        println!("{}", serde_json::to_string_pretty(&settings)?);
        Ok(())
    }
}
