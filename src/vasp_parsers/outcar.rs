use std::{
    fs::File,
    io::Read,
    str::FromStr,
    path::{
        Path,
        PathBuf,
    },
};

use anyhow::Context;
use flate2::read::GzDecoder;
use regex::Regex;

use crate::{
    error::VaspWrapperError,
    types::Result,
};


/// Marker VASP prints once a run has terminated normally.
pub const COMPLETION_MARKER: &str = "General timing and accounting informations for this job";


/// What the relaxation workflow needs from an OUTCAR.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcar {
    pub nions    : usize,
    pub toten    : Vec<f64>,   // free energy TOTEN of each ionic step
    pub toten_z  : Vec<f64>,   // energy(sigma->0) of each ionic step
    pub complete : bool,
}


impl Outcar {
    /// Read `path`, or `path.gz` when only the compressed file exists.
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let path = path.as_ref();
        let gz = {
            let mut p = path.as_os_str().to_owned();
            p.push(".gz");
            PathBuf::from(p)
        };

        let mut content = String::new();
        if path.is_file() || !gz.is_file() {
            File::open(path)
                .and_then(|mut f| f.read_to_string(&mut content))
                .with_context(|| format!("Failed to read OUTCAR {:?}", path))?;
        } else {
            File::open(&gz)
                .and_then(|f| GzDecoder::new(f).read_to_string(&mut content))
                .with_context(|| format!("Failed to read OUTCAR {:?}", &gz))?;
        }

        content.parse()
    }

    pub fn ionic_steps(&self) -> usize {
        self.toten.len()
    }

    /// energy(sigma->0) of the last ionic step.
    pub fn final_energy(&self) -> Option<f64> {
        self.toten_z.last().copied()
    }

    fn parse_floats(context: &str, re: &str) -> Result<Vec<f64>> {
        Regex::new(re)?
            .captures_iter(context)
            .map(|x| {
                let s = x.get(1).map_or("", |m| m.as_str());
                s.parse::<f64>()
                    .map_err(|_| anyhow::Error::from(VaspWrapperError::parse("OUTCAR", format!("invalid number {:?}", s))))
            })
            .collect()
    }

    fn parse_nions(context: &str) -> Result<usize> {
        Regex::new(r"NIONS = \s+(\d+)")?
            .captures(context)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .ok_or_else(|| VaspWrapperError::parse("OUTCAR", "NIONS not found").into())
    }

    fn parse_toten(context: &str) -> Result<Vec<f64>> {
        Self::parse_floats(context, r"free  energy   TOTEN  = \s*([-+]?[0-9]+[.]?[0-9]*([eE][-+]?[0-9]+)?) eV")
    }

    fn parse_toten_z(context: &str) -> Result<Vec<f64>> {
        Self::parse_floats(context, r"energy  without entropy=\s+[-+]?[0-9]+[.]?[0-9]*?  energy\(sigma->0\) =\s+([-+]?[0-9]+[.]?[0-9]*)")
    }
}


impl FromStr for Outcar {
    type Err = anyhow::Error;

    fn from_str(context: &str) -> Result<Self> {
        Ok(Self {
            nions    : Self::parse_nions(context)?,
            toten    : Self::parse_toten(context)?,
            toten_z  : Self::parse_toten_z(context)?,
            complete : context.contains(COMPLETION_MARKER),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nions() {
        let input = r#"
   k-points           NKPTS =      1   k-points in BZ     NKDIM =      1   number of bands    NBANDS=      8
   number of dos      NEDOS =    301   number of ions     NIONS =      4
   non local maximal  LDIM  =      4   non local SUM 2l+1 LMDIM =      8 "#;
        assert_eq!(Outcar::parse_nions(&input).unwrap(), 4);
        assert!(Outcar::parse_nions("nothing here").is_err());
    }

    #[test]
    fn test_parse_toten() {
        let input = r#"
  free energy    TOTEN  =        51.95003235 eV
  free energy    TOTEN  =       -10.91478741 eV
  free energy    TOTEN  =       -22.11911831 eV
  free  energy   TOTEN  =       -19.26550806 eV
  free  energy   TOTEN  =       -19.25519593 eV
  free  energy   TOTEN  =       -19.26817124 eV
"#;
        let output = vec![-19.26550806f64, -19.25519593, -19.26817124];
        assert_eq!(Outcar::parse_toten(&input).unwrap(), output);
    }

    #[test]
    fn test_parse_toten_z() {
        let input = r#"
  energy without entropy =       51.93837380  energy(sigma->0) =       51.94614617
  energy without entropy =      -10.92638322  energy(sigma->0) =      -10.91865268
  energy without entropy =      -22.13071412  energy(sigma->0) =      -22.12298358
  energy  without entropy=      -19.27710387  energy(sigma->0) =      -19.26937333
  energy  without entropy=      -19.26679174  energy(sigma->0) =      -19.25906120
  energy  without entropy=      -19.27976705  energy(sigma->0) =      -19.27203651"#;
        let output = vec![-19.26937333f64, -19.25906120, -19.27203651];
        assert_eq!(Outcar::parse_toten_z(&input).unwrap(), output);
    }

    #[test]
    fn test_completion() {
        let input = format!(r#"
   number of dos      NEDOS =    301   number of ions     NIONS =      4
  free  energy   TOTEN  =       -19.26550806 eV
  energy  without entropy=      -19.27710387  energy(sigma->0) =      -19.26937333
 {}
"#, COMPLETION_MARKER);
        let outcar: Outcar = input.parse().unwrap();
        assert!(outcar.complete);
        assert_eq!(outcar.ionic_steps(), 1);
        assert_eq!(outcar.final_energy(), Some(-19.26937333));

        let outcar: Outcar = input.replace(COMPLETION_MARKER, "").parse().unwrap();
        assert!(!outcar.complete);
    }
}
