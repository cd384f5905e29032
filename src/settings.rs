//! Settings of a relaxation: scheduler resources, how VASP is launched and
//! which files are kept between runs.
//!
//! Settings live in `relax.json` (or any `*.toml` file) and are layered as
//!
//! 1. user defaults in `<config dir>/vaspwrap/settings.toml`, if present;
//! 2. the settings file itself;
//! 3. `VASPWRAP_*` environment variables, e.g. `VASPWRAP_VASP_CMD`.
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use directories::ProjectDirs;
use figment::{
    Figment,
    error::Kind,
    providers::{
        Env,
        Format,
        Json,
        Toml,
    },
};
use log::debug;
use serde::{
    Deserialize,
    Serialize,
};

use crate::error::VaspWrapperError;


pub const SETTINGS_FILE_NAME: &str = "relax.json";

/// Files of a finished run the relaxation loop reads back.
pub const RUN_OUTPUT_FILES: [&str; 2] = ["OUTCAR", "CONTCAR"];


fn default_vasp_cmd() -> String { "vasp_std".to_string() }
fn default_submit_cmd() -> String { "qsub".to_string() }
fn default_run_limit() -> usize { 10 }
fn default_compress() -> Vec<String> { vec!["OUTCAR".to_string()] }
fn default_remove() -> Vec<String> {
    ["IBZKPT", "CHG", "CHGCAR", "WAVECAR", "TMPCAR", "EIGENVAL",
     "DOSCAR", "PROCAR", "PCDAT", "XDATCAR", "LOCPOT", "vasprun.xml"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    // Scheduler resources, all required.
    pub queue           : String,
    pub ppn             : u32,
    pub atom_per_proc   : u32,
    pub walltime        : String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account         : Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmem            : Option<String>,
    #[serde(default)]
    pub priority        : i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message         : Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email           : Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qos             : Option<String>,
    #[serde(default = "default_submit_cmd")]
    pub submit_cmd      : String,

    // VASP parallelisation and launching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npar            : Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ncore           : Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpar            : Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ncpus           : Option<u32>,
    /// Command launching VASP, `{NCPUS}` is replaced by the cpu count.
    #[serde(default = "default_vasp_cmd")]
    pub vasp_cmd        : String,

    // Relaxation control.
    #[serde(default = "default_run_limit")]
    pub run_limit       : usize,
    /// Energy change (eV) between two successive runs regarded as converged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrg_convergence : Option<f64>,
    /// INCAR overrides applied to the first run only.
    #[serde(default, rename = "initial", skip_serializing_if = "Option::is_none")]
    pub initial_incar   : Option<PathBuf>,
    /// INCAR overrides applied to the final static run.
    #[serde(default, rename = "final", skip_serializing_if = "Option::is_none")]
    pub final_incar     : Option<PathBuf>,

    // File handling between runs.
    #[serde(default = "default_compress")]
    pub compress        : Vec<String>,
    #[serde(default = "default_remove")]
    pub remove          : Vec<String>,
    #[serde(default, rename = "copy")]
    pub copy_files      : Vec<String>,
    #[serde(default, rename = "move")]
    pub move_files      : Vec<String>,
    #[serde(default)]
    pub extra_input_files: Vec<String>,

    // Job script hooks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble        : Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerun          : Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postrun         : Option<String>,
}


impl Settings {
    /// Settings written by `vaspwrap settings --init`.
    pub fn example() -> Self {
        Self {
            queue           : "batch".to_string(),
            ppn             : 16,
            atom_per_proc   : 2,
            walltime        : "24:00:00".to_string(),
            account         : None,
            pmem            : None,
            priority        : 0,
            message         : Some("ae".to_string()),
            email           : None,
            qos             : None,
            submit_cmd      : default_submit_cmd(),
            npar            : None,
            ncore           : Some(4),
            kpar            : None,
            ncpus           : None,
            vasp_cmd        : "mpirun -np {NCPUS} vasp_std".to_string(),
            run_limit       : default_run_limit(),
            nrg_convergence : None,
            initial_incar   : None,
            final_incar     : None,
            compress        : default_compress(),
            remove          : default_remove(),
            copy_files      : vec![],
            move_files      : vec![],
            extra_input_files: vec![],
            preamble        : None,
            prerun          : None,
            postrun         : None,
        }
    }

    /// Command line launching VASP on `ncpus` cores.
    pub fn vasp_command(&self, ncpus: u32) -> String {
        self.vasp_cmd.replace("{NCPUS}", &self.ncpus.unwrap_or(ncpus).to_string())
    }

    fn validate(&self) -> Result<(), VaspWrapperError> {
        let invalid = |key: &str, reason: &str| Err(VaspWrapperError::InvalidSetting {
            key: key.to_string(),
            reason: reason.to_string(),
        });

        if self.ppn == 0 {
            return invalid("ppn", "must be positive");
        }
        if self.atom_per_proc == 0 {
            return invalid("atom_per_proc", "must be positive");
        }
        if self.run_limit == 0 {
            return invalid("run_limit", "must be positive");
        }
        if self.npar.is_some() && self.ncore.is_some() {
            return invalid("ncore", "NPAR and NCORE cannot be set together");
        }
        for (key, names) in [("remove", &self.remove), ("move", &self.move_files), ("copy", &self.copy_files)] {
            if let Some(name) = names.iter().find(|n| RUN_OUTPUT_FILES.contains(&n.as_str())) {
                return invalid(key, &format!("{} is read back after each run and must stay in place", name));
            }
        }
        if self.compress.iter().any(|n| n == "CONTCAR") {
            return invalid("compress", "CONTCAR is read back after each run and must stay in place");
        }
        if let Some(de) = self.nrg_convergence {
            if !(de > 0.0) {
                return invalid("nrg_convergence", "must be a positive energy in eV");
            }
        }
        Ok(())
    }
}


fn is_toml(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("toml"))
}


fn user_defaults_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "vaspwrap")
        .map(|dirs| dirs.config_dir().join("settings.toml"))
}


fn from_figment(err: figment::Error) -> VaspWrapperError {
    match &err.kind {
        Kind::MissingField(key) => VaspWrapperError::MissingSetting(key.to_string()),
        _ => VaspWrapperError::Settings(err.to_string()),
    }
}


/// Read settings from a JSON file (TOML when the extension is `.toml`).
pub fn read_settings<P: AsRef<Path>>(path: P) -> Result<Settings, VaspWrapperError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| VaspWrapperError::Settings(format!("cannot read {:?}: {}", path, e)))?;

    let mut figment = Figment::new();
    if let Some(user) = user_defaults_path().filter(|p| p.is_file()) {
        debug!("Merging user defaults from {:?}", &user);
        figment = figment.merge(Toml::file(user));
    }
    figment = if is_toml(path) {
        figment.merge(Toml::string(&content))
    } else {
        figment.merge(Json::string(&content))
    };
    figment = figment.merge(Env::prefixed("VASPWRAP_").ignore(&["log"]));

    let settings: Settings = figment.extract().map_err(from_figment)?;
    settings.validate()?;
    Ok(settings)
}


/// Write settings as pretty JSON (TOML when the extension is `.toml`).
pub fn write_settings<P: AsRef<Path>>(settings: &Settings, path: P) -> Result<(), VaspWrapperError> {
    let path = path.as_ref();
    let content = if is_toml(path) {
        toml::to_string_pretty(settings)
            .map_err(|e| VaspWrapperError::Settings(e.to_string()))?
    } else {
        let mut s = serde_json::to_string_pretty(settings)
            .map_err(|e| VaspWrapperError::Settings(e.to_string()))?;
        s.push('\n');
        s
    };

    fs::write(path, content)
        .map_err(|e| VaspWrapperError::Settings(format!("cannot write {:?}: {}", path, e)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_is_valid() {
        assert!(Settings::example().validate().is_ok());
    }

    #[test]
    fn test_vasp_command() {
        let mut s = Settings::example();
        assert_eq!(s.vasp_command(32), "mpirun -np 32 vasp_std");
        s.ncpus = Some(8);
        assert_eq!(s.vasp_command(32), "mpirun -np 8 vasp_std");
        s.vasp_cmd = "vasp_gam".to_string();
        assert_eq!(s.vasp_command(32), "vasp_gam");
    }

    #[test]
    fn test_validate() {
        let mut s = Settings::example();
        s.npar = Some(2);
        assert!(matches!(s.validate(),
                         Err(VaspWrapperError::InvalidSetting { ref key, .. }) if key == "ncore"));

        let mut s = Settings::example();
        s.ppn = 0;
        assert!(s.validate().is_err());

        let mut s = Settings::example();
        s.nrg_convergence = Some(-1.0);
        assert!(s.validate().is_err());

        let mut s = Settings::example();
        s.remove.push("OUTCAR".to_string());
        assert!(matches!(s.validate(),
                         Err(VaspWrapperError::InvalidSetting { ref key, .. }) if key == "remove"));

        let mut s = Settings::example();
        s.move_files.push("CONTCAR".to_string());
        assert!(matches!(s.validate(),
                         Err(VaspWrapperError::InvalidSetting { ref key, .. }) if key == "move"));

        let mut s = Settings::example();
        s.compress.push("CONTCAR".to_string());
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_is_toml() {
        assert!(is_toml(Path::new("relax.toml")));
        assert!(is_toml(Path::new("a/b/RELAX.TOML")));
        assert!(!is_toml(Path::new("relax.json")));
        assert!(!is_toml(Path::new("relax")));
    }
}
