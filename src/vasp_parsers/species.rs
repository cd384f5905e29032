//! SPECIES file: maps POSCAR species to POTCARs and per-species INCAR tags.
//!
//! ```text
//! POTCAR_DIR_PATH = /home/user/potcars/PBE
//! POSCAR_name  POTCAR_name  POTCAR_location  MAGMOM
//! Ni           Ni           /Ni              2.0
//! Al           Al           /Al              0.0
//! ```
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
};

use anyhow::Context;
use indexmap::IndexMap;

use crate::{
    error::VaspWrapperError,
    types::Result,
};


#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    pub name            : String,
    pub potcar_name     : String,
    pub potcar_location : String,
    /// Extra INCAR tags, e.g. MAGMOM, in column order.
    pub tags            : IndexMap<String, String>,
}


#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesSettings {
    pub potcar_dir : PathBuf,
    pub tags       : Vec<String>,
    pub species    : Vec<Species>,
}


fn parse_err(reason: impl Into<String>) -> anyhow::Error {
    VaspWrapperError::parse("SPECIES", reason).into()
}


impl SpeciesSettings {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let txt = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read SPECIES {:?}", path.as_ref()))?;
        txt.parse()
    }

    pub fn get(&self, name: &str) -> Option<&Species> {
        self.species.iter().find(|s| s.name == name)
    }

    /// Species names in file order.
    pub fn names(&self) -> Vec<&str> {
        self.species.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn potcar_path(&self, species: &Species) -> PathBuf {
        self.potcar_dir
            .join(species.potcar_location.trim_start_matches('/'))
            .join("POTCAR")
    }
}


impl FromStr for SpeciesSettings {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut lines = s.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));

        let potcar_dir = match lines.next().and_then(|l| l.split_once('=')) {
            Some((k, v)) if k.trim() == "POTCAR_DIR_PATH" => PathBuf::from(v.trim()),
            _ => return Err(parse_err("first line must be `POTCAR_DIR_PATH = <dir>`")),
        };

        let header = lines.next()
            .ok_or_else(|| parse_err("missing header line"))?
            .split_whitespace()
            .collect::<Vec<_>>();
        if header.len() < 3 || header[.. 3] != ["POSCAR_name", "POTCAR_name", "POTCAR_location"] {
            return Err(parse_err(format!("header must start with `POSCAR_name POTCAR_name POTCAR_location`, got {:?}", header)));
        }
        let tags = header[3 ..].iter().map(|t| t.to_ascii_uppercase()).collect::<Vec<_>>();

        let species = lines.map(|l| {
            let v = l.split_whitespace().collect::<Vec<_>>();
            if v.len() != header.len() {
                return Err(parse_err(format!("expected {} columns in line {:?}", header.len(), l)));
            }
            Ok(Species {
                name            : v[0].to_string(),
                potcar_name     : v[1].to_string(),
                potcar_location : v[2].to_string(),
                tags            : tags.iter().cloned().zip(v[3 ..].iter().map(|x| x.to_string())).collect(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

        if species.is_empty() {
            return Err(parse_err("no species listed"));
        }

        Ok(Self { potcar_dir, tags, species })
    }
}
