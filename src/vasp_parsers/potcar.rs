use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use anyhow::{
    Context,
    Result,
};

use crate::{
    error::VaspWrapperError,
    vasp_parsers::species::SpeciesSettings,
};


pub struct AtomicPotcar {
    pub symbol: String,                 // POSCAR species name, Ni, Al ...
    pub path: PathBuf,                  // Where the content comes from
    pub content: String,                // Raw content of single element POTCAR
}


impl AtomicPotcar {
    pub fn from_file(symbol: &str, path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read POTCAR of {} from {:?}", symbol, path))?;
        if content.trim().is_empty() {
            return Err(VaspWrapperError::parse("POTCAR", format!("{:?} is empty", path)).into());
        }

        Ok(Self {
            symbol: symbol.to_string(),
            path: path.to_path_buf(),
            content,
        })
    }
}


pub struct Potcar {
    pub data: Vec<AtomicPotcar>,
}


impl Potcar {
    /// Collect the POTCARs of `ion_types`, in that order.
    pub fn from_species(species: &SpeciesSettings, ion_types: &[String]) -> Result<Self> {
        let data = ion_types.iter()
            .map(|t| {
                let s = species.get(t)
                    .ok_or_else(|| VaspWrapperError::parse("SPECIES", format!("species {:?} is not listed", t)))?;
                AtomicPotcar::from_file(t, &species.potcar_path(s))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { data })
    }

    pub fn to_file(&self, path: &(impl AsRef<Path> + ?Sized)) -> Result<()> {
        let mut content = String::new();
        for p in self.data.iter() {
            content.push_str(&p.content);
            if !p.content.ends_with('\n') {
                content.push('\n');
            }
        }
        fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write POTCAR {:?}", path.as_ref()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_concatenate_potcars() -> Result<()> {
        let tmp = TempDir::new("vaspwrap_potcar")?;
        for (dir, text) in [("Ni_pv", "PAW_PBE Ni_pv\n End of Dataset"), ("Al", "PAW_PBE Al\n End of Dataset\n")] {
            fs::create_dir_all(tmp.path().join(dir))?;
            fs::write(tmp.path().join(dir).join("POTCAR"), text)?;
        }

        let species: SpeciesSettings = format!(
            "POTCAR_DIR_PATH = {}\nPOSCAR_name POTCAR_name POTCAR_location\nNi Ni_pv /Ni_pv\nAl Al /Al\nVa Va /Va\n",
            tmp.path().display()).parse()?;

        let potcar = Potcar::from_species(&species, &["Al".to_string(), "Ni".to_string()])?;
        let out = tmp.path().join("POTCAR");
        potcar.to_file(&out)?;
        assert_eq!(fs::read_to_string(&out)?,
                   "PAW_PBE Al\n End of Dataset\nPAW_PBE Ni_pv\n End of Dataset\n");

        assert!(Potcar::from_species(&species, &["Va".to_string()]).is_err());
        assert!(Potcar::from_species(&species, &["Cu".to_string()]).is_err());
        Ok(())
    }
}
