//! Where the input templates of a calculation live.
//!
//! A project is a directory tree marked by a `.casm` directory:
//!
//! ```text
//! <root>/.casm/
//! <root>/settings/calctype.<ct>/{relax.json, INCAR, KPOINTS, POSCAR, SPECIES}
//! <root>/training_data/<config>/POS
//! <root>/training_data/<config>/settings/calctype.<ct>/   (overrides)
//! <root>/training_data/<config>/calctype.<ct>/            (calculation)
//! ```
use std::path::{
    Path,
    PathBuf,
};

use log::debug;

use crate::{
    error::VaspWrapperError,
    types::Result,
};


/// Input files VASP reads in each run directory.
pub const VASP_INPUT_FILE_NAMES: [&str; 4] = ["INCAR", "KPOINTS", "POSCAR", "POTCAR"];

/// Template files searched for in the settings directories.
pub const TEMPLATE_FILE_NAMES: [&str; 4] = ["INCAR", "KPOINTS", "POSCAR", "SPECIES"];

pub const PROJECT_MARKER: &str = ".casm";
pub const TRAINING_DATA_DIR: &str = "training_data";
pub const STRUCTURE_FILE_NAME: &str = "POS";


#[derive(Debug, Clone, PartialEq)]
pub struct ProjectLayout {
    pub root       : PathBuf,
    pub configname : String,
    pub calctype   : String,
}


impl ProjectLayout {
    /// Find the project containing `configdir` by walking up to the `.casm` marker.
    pub fn discover(configdir: &Path, calctype: &str) -> Result<Self> {
        let configdir = configdir.canonicalize()
            .map_err(|_| VaspWrapperError::ProjectNotFound(configdir.to_path_buf()))?;

        let root = configdir.ancestors()
            .find(|p| p.join(PROJECT_MARKER).is_dir())
            .ok_or_else(|| VaspWrapperError::ProjectNotFound(configdir.clone()))?
            .to_path_buf();

        let configname = configdir.strip_prefix(root.join(TRAINING_DATA_DIR))
            .map_err(|_| VaspWrapperError::ProjectNotFound(configdir.clone()))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        if configname.is_empty() {
            return Err(VaspWrapperError::ProjectNotFound(configdir).into());
        }

        debug!("Project root = {:?}, configuration = {}", &root, &configname);
        Ok(Self {
            root,
            configname,
            calctype: calctype.to_string(),
        })
    }

    pub fn configdir(&self) -> PathBuf {
        self.root.join(TRAINING_DATA_DIR).join(&self.configname)
    }

    pub fn calcdir(&self) -> PathBuf {
        self.configdir().join(format!("calctype.{}", self.calctype))
    }

    pub fn structure_file(&self) -> PathBuf {
        self.configdir().join(STRUCTURE_FILE_NAME)
    }

    /// Settings directories, most specific first.
    pub fn settings_dirs(&self) -> Vec<PathBuf> {
        let ct = format!("calctype.{}", self.calctype);
        vec![
            self.configdir().join("settings").join(&ct),
            self.root.join("settings").join(ct),
        ]
    }
}


/// First existing `name` in `dirs`.
pub fn crawl(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    dirs.iter()
        .map(|d| d.join(name))
        .find(|p| p.is_file())
}


/// Same as `crawl`, but a missing file is an error.
pub fn crawl_required(dirs: &[PathBuf], name: &str) -> Result<PathBuf> {
    crawl(dirs, name).ok_or_else(|| VaspWrapperError::MissingInputFile {
        name: name.to_string(),
        searched: dirs.to_vec(),
    }.into())
}


/// Template files used to build the input of a calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFileSet {
    pub incar         : PathBuf,
    pub kpoints       : PathBuf,
    /// Reference cell the KPOINTS mesh was chosen for.
    pub prim_poscar   : Option<PathBuf>,
    pub species       : PathBuf,
}


impl InputFileSet {
    pub fn locate(dirs: &[PathBuf]) -> Result<Self> {
        Ok(Self {
            incar       : crawl_required(dirs, TEMPLATE_FILE_NAMES[0])?,
            kpoints     : crawl_required(dirs, TEMPLATE_FILE_NAMES[1])?,
            prim_poscar : crawl(dirs, TEMPLATE_FILE_NAMES[2]),
            species     : crawl_required(dirs, TEMPLATE_FILE_NAMES[3])?,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempdir::TempDir;

    #[test]
    fn test_discover_and_crawl() -> Result<()> {
        let tmp = TempDir::new("vaspwrap_layout")?;
        let root = tmp.path();
        fs::create_dir_all(root.join(".casm"))?;
        let configdir = root.join("training_data/SCEL2_1_2_1_0_0_0/1");
        fs::create_dir_all(&configdir)?;

        let layout = ProjectLayout::discover(&configdir, "default")?;
        assert_eq!(layout.configname, "SCEL2_1_2_1_0_0_0/1");
        assert!(layout.calcdir().ends_with("SCEL2_1_2_1_0_0_0/1/calctype.default"));

        let dirs = layout.settings_dirs();
        fs::create_dir_all(&dirs[0])?;
        fs::create_dir_all(&dirs[1])?;
        for name in ["INCAR", "KPOINTS", "SPECIES"] {
            fs::write(dirs[1].join(name), "")?;
        }
        fs::write(dirs[0].join("INCAR"), "")?;

        let set = InputFileSet::locate(&dirs)?;
        assert_eq!(set.incar, dirs[0].join("INCAR"));
        assert_eq!(set.kpoints, dirs[1].join("KPOINTS"));
        assert_eq!(set.prim_poscar, None);

        fs::remove_file(dirs[1].join("SPECIES"))?;
        let err = InputFileSet::locate(&dirs).unwrap_err();
        assert!(matches!(err.downcast_ref::<VaspWrapperError>(),
                         Some(VaspWrapperError::MissingInputFile { name, .. }) if name == "SPECIES"));
        Ok(())
    }

    #[test]
    fn test_discover_without_marker() {
        let tmp = TempDir::new("vaspwrap_layout").unwrap();
        let err = ProjectLayout::discover(tmp.path(), "default").unwrap_err();
        assert!(matches!(err.downcast_ref::<VaspWrapperError>(),
                         Some(VaspWrapperError::ProjectNotFound(_))));
    }
}
