use std::{
    fmt,
    fs,
    path::Path,
    str::FromStr,
};

use anyhow::Context;
use log::warn;

use crate::{
    error::VaspWrapperError,
    types::{
        Result,
        reciprocal_lengths,
    },
    Poscar,
};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshScheme {
    Gamma,
    MonkhorstPack,
}


/// Automatic k-point mesh, or any other KPOINTS file kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Kpoints {
    Mesh {
        comment : String,
        scheme  : MeshScheme,
        mesh    : [u32; 3],
        shift   : [f64; 3],
    },
    Verbatim(String),
}


impl Kpoints {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let txt = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read KPOINTS {:?}", path.as_ref()))?;
        txt.parse()
    }

    pub fn to_file(&self, path: &(impl AsRef<Path> + ?Sized)) -> Result<()> {
        fs::write(path.as_ref(), self.to_string())
            .with_context(|| format!("Failed to write KPOINTS {:?}", path.as_ref()))
    }

    /// Mesh for `sup` with the same k-point density the current mesh has for `prim`.
    ///
    /// Each subdivision is scaled by the ratio of reciprocal lattice vector
    /// lengths, rounded up, never less than 1.
    pub fn scale_to(&self, prim: &Poscar, sup: &Poscar) -> Self {
        match self {
            Kpoints::Mesh { comment, scheme, mesh, shift } => {
                let rp = reciprocal_lengths(&prim.cell);
                let rs = reciprocal_lengths(&sup.cell);
                let mut new_mesh = [1u32; 3];
                for i in 0 .. 3 {
                    let n = (mesh[i] as f64 * rs[i] / rp[i] - 1E-6).ceil();
                    new_mesh[i] = if n.is_finite() && n >= 1.0 { n as u32 } else { 1 };
                }

                Kpoints::Mesh {
                    comment : comment.clone(),
                    scheme  : *scheme,
                    mesh    : new_mesh,
                    shift   : *shift,
                }
            },
            Kpoints::Verbatim(_) => {
                warn!("KPOINTS is not an automatic mesh, it is copied without scaling.");
                self.clone()
            },
        }
    }
}


impl FromStr for Kpoints {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lines = s.lines().collect::<Vec<_>>();
        if lines.len() < 3 {
            return Err(VaspWrapperError::parse("KPOINTS", "file needs at least 3 lines").into());
        }

        let nkpts = lines[1].trim().parse::<i64>();
        let scheme = match lines[2].trim().chars().next() {
            Some('g') | Some('G') => Some(MeshScheme::Gamma),
            Some('m') | Some('M') => Some(MeshScheme::MonkhorstPack),
            _ => None,
        };

        let (scheme, mesh_line) = match (nkpts, scheme, lines.get(3)) {
            (Ok(0), Some(scheme), Some(line)) => (scheme, line),
            _ => return Ok(Kpoints::Verbatim(s.to_string())),
        };

        let mesh = mesh_line.split_whitespace()
            .map(|x| x.parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| VaspWrapperError::parse("KPOINTS", format!("invalid mesh line {:?}", mesh_line)))?;
        if mesh.len() != 3 || mesh.contains(&0) {
            return Err(VaspWrapperError::parse("KPOINTS", format!("mesh needs 3 positive numbers: {:?}", mesh_line)).into());
        }

        let shift = match lines.get(4).map(|l| l.trim()).filter(|l| !l.is_empty()) {
            Some(line) => {
                let v = line.split_whitespace()
                    .map(|x| x.parse::<f64>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| VaspWrapperError::parse("KPOINTS", format!("invalid shift line {:?}", line)))?;
                if v.len() != 3 {
                    return Err(VaspWrapperError::parse("KPOINTS", format!("shift needs 3 numbers: {:?}", line)).into());
                }
                [v[0], v[1], v[2]]
            },
            None => [0.0; 3],
        };

        Ok(Kpoints::Mesh {
            comment: lines[0].trim().to_string(),
            scheme,
            mesh: [mesh[0], mesh[1], mesh[2]],
            shift,
        })
    }
}


impl fmt::Display for Kpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kpoints::Mesh { comment, scheme, mesh, shift } => {
                writeln!(f, "{}", comment)?;
                writeln!(f, "0")?;
                writeln!(f, "{}", match scheme {
                    MeshScheme::Gamma         => "Gamma",
                    MeshScheme::MonkhorstPack => "Monkhorst-Pack",
                })?;
                writeln!(f, "{} {} {}", mesh[0], mesh[1], mesh[2])?;
                writeln!(f, "{} {} {}", shift[0], shift[1], shift[2])
            },
            Kpoints::Verbatim(s) => write!(f, "{}", s),
        }
    }
}
