use std::{
    fmt,
    fs,
    path::Path,
    str::FromStr,
};

use anyhow::Context;

use crate::{
    error::VaspWrapperError,
    types::{
        Result,
        Mat33,
        MatX3,
        inverse,
        volume,
    },
};


/// Species name marking a vacant site.
pub const VACANCY: &str = "Va";


#[derive(Debug, Clone, PartialEq)]
pub struct Poscar {
    pub comment       : String,
    pub cell          : Mat33<f64>,   // already scaled, in Angstrom
    pub ion_types     : Vec<String>,
    pub ions_per_type : Vec<usize>,
    pub pos_cart      : MatX3<f64>,
    pub pos_frac      : MatX3<f64>,
    pub constraints   : Option<MatX3<bool>>,
}


fn parse_err(reason: impl Into<String>) -> anyhow::Error {
    VaspWrapperError::parse("POSCAR", reason).into()
}


fn parse_floats(line: &str, n: usize, what: &str) -> Result<Vec<f64>> {
    let v = line.split_whitespace()
        .take(n)
        .map(|x| x.parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| parse_err(format!("invalid {} line: {:?}", what, line)))?;
    if v.len() != n {
        return Err(parse_err(format!("{} line needs {} numbers: {:?}", what, n, line)));
    }
    Ok(v)
}


fn parse_flag(s: &str) -> Result<bool> {
    match s {
        "T" | "t" => Ok(true),
        "F" | "f" => Ok(false),
        _ => Err(parse_err(format!("invalid selective dynamics flag {:?}", s))),
    }
}


fn frac_to_cart(frac: &[f64; 3], cell: &Mat33<f64>) -> [f64; 3] {
    let mut ret = [0.0; 3];
    for j in 0 .. 3 {
        ret[j] = (0 .. 3).map(|i| frac[i] * cell[i][j]).sum();
    }
    ret
}


impl Poscar {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let txt = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read POSCAR {:?}", path.as_ref()))?;
        txt.parse()
            .with_context(|| format!("Failed to parse POSCAR {:?}", path.as_ref()))
    }

    pub fn to_file(&self, path: &(impl AsRef<Path> + ?Sized)) -> Result<()> {
        fs::write(path.as_ref(), self.to_string())
            .with_context(|| format!("Failed to write POSCAR {:?}", path.as_ref()))
    }

    pub fn natoms(&self) -> usize {
        self.ions_per_type.iter().sum()
    }

    pub fn volume(&self) -> f64 {
        volume(&self.cell).abs()
    }

    /// Species name of every atom in file order.
    pub fn atom_types(&self) -> Vec<&str> {
        self.ion_types.iter()
            .zip(self.ions_per_type.iter())
            .flat_map(|(t, &n)| std::iter::repeat(t.as_str()).take(n))
            .collect()
    }

    /// Regroup atoms so species follow `order`, keeping the relative order
    /// of atoms of one species. Repeated species groups are merged.
    pub fn sorted_by(&self, order: &[impl AsRef<str>]) -> Result<Self> {
        let types = self.atom_types();
        if let Some(t) = types.iter().find(|t| !order.iter().any(|o| o.as_ref() == **t)) {
            return Err(parse_err(format!("species {:?} is not listed in {:?}",
                                         t, order.iter().map(|o| o.as_ref()).collect::<Vec<_>>())));
        }

        let mut ret = Self {
            comment       : self.comment.clone(),
            cell          : self.cell,
            ion_types     : vec![],
            ions_per_type : vec![],
            pos_cart      : vec![],
            pos_frac      : vec![],
            constraints   : self.constraints.as_ref().map(|_| vec![]),
        };

        for species in order.iter().map(|o| o.as_ref()) {
            let idx = types.iter()
                .enumerate()
                .filter(|(_, t)| **t == species)
                .map(|(i, _)| i)
                .collect::<Vec<_>>();
            if idx.is_empty() {
                continue;
            }

            ret.ion_types.push(species.to_string());
            ret.ions_per_type.push(idx.len());
            for i in idx {
                ret.pos_cart.push(self.pos_cart[i]);
                ret.pos_frac.push(self.pos_frac[i]);
                if let (Some(dst), Some(src)) = (ret.constraints.as_mut(), self.constraints.as_ref()) {
                    dst.push(src[i]);
                }
            }
        }

        Ok(ret)
    }

    /// Drop every site occupied by a vacancy.
    pub fn without_vacancies(&self) -> Self {
        let keep = self.atom_types()
            .into_iter()
            .map(|t| t != VACANCY)
            .collect::<Vec<_>>();
        let pick = |v: &MatX3<f64>| v.iter()
            .zip(keep.iter())
            .filter(|(_, k)| **k)
            .map(|(x, _)| *x)
            .collect::<Vec<_>>();

        let (ion_types, ions_per_type): (Vec<_>, Vec<_>) = self.ion_types.iter()
            .zip(self.ions_per_type.iter())
            .filter(|(t, n)| t.as_str() != VACANCY && **n > 0)
            .map(|(t, &n)| (t.clone(), n))
            .unzip();

        Self {
            comment       : self.comment.clone(),
            cell          : self.cell,
            ion_types,
            ions_per_type,
            pos_cart      : pick(&self.pos_cart),
            pos_frac      : pick(&self.pos_frac),
            constraints   : self.constraints.as_ref().map(|c| c.iter()
                                                         .zip(keep.iter())
                                                         .filter(|(_, k)| **k)
                                                         .map(|(x, _)| *x)
                                                         .collect()),
        }
    }
}


impl FromStr for Poscar {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut lines = s.lines();
        let mut next_line = |what: &str| lines.next()
            .ok_or_else(|| parse_err(format!("unexpected end of file, expecting {}", what)));

        let comment = next_line("comment")?.trim().to_string();
        let scale = parse_floats(next_line("scaling factor")?, 1, "scaling factor")?[0];

        let mut cell = [[0.0; 3]; 3];
        for row in cell.iter_mut() {
            let v = parse_floats(next_line("lattice vector")?, 3, "lattice vector")?;
            row.copy_from_slice(&v);
        }

        if scale == 0.0 {
            return Err(parse_err("scaling factor cannot be zero"));
        }
        let factor = if scale < 0.0 {
            // negative scale is the target volume
            (-scale / volume(&cell).abs()).cbrt()
        } else {
            scale
        };
        cell.iter_mut().flatten().for_each(|x| *x *= factor);

        let symbols = next_line("element symbols")?;
        if symbols.split_whitespace().next().map_or(true, |x| x.parse::<f64>().is_ok()) {
            return Err(parse_err("element symbols line is required (VASP 5 format)"));
        }
        let ion_types = symbols.split_whitespace().map(str::to_string).collect::<Vec<_>>();

        let counts = next_line("ion counts")?;
        let ions_per_type = counts.split_whitespace()
            .map(|x| x.parse::<usize>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| parse_err(format!("invalid ion counts line: {:?}", counts)))?;
        if ions_per_type.len() != ion_types.len() {
            return Err(parse_err(format!("{} element symbols but {} ion counts",
                                         ion_types.len(), ions_per_type.len())));
        }
        let natoms = ions_per_type.iter().sum::<usize>();

        let mut mode = next_line("coordinate mode")?.trim();
        let selective = mode.starts_with(|c: char| c == 's' || c == 'S');
        if selective {
            mode = next_line("coordinate mode")?.trim();
        }
        let is_cart = mode.starts_with(|c: char| c == 'c' || c == 'C' || c == 'k' || c == 'K');

        let mut pos = Vec::with_capacity(natoms);
        let mut constraints = Vec::with_capacity(if selective { natoms } else { 0 });
        for _ in 0 .. natoms {
            let line = next_line("atomic position")?;
            let v = parse_floats(line, 3, "atomic position")?;
            pos.push([v[0], v[1], v[2]]);

            if selective {
                let flags = line.split_whitespace()
                    .skip(3)
                    .take(3)
                    .map(parse_flag)
                    .collect::<Result<Vec<_>>>()?;
                if flags.len() != 3 {
                    return Err(parse_err(format!("missing selective dynamics flags: {:?}", line)));
                }
                constraints.push([flags[0], flags[1], flags[2]]);
            }
        }

        let (pos_cart, pos_frac) = if is_cart {
            let inv = inverse(&cell).ok_or_else(|| parse_err("singular lattice"))?;
            let cart = pos.iter()
                .map(|p| [p[0] * factor, p[1] * factor, p[2] * factor])
                .collect::<Vec<_>>();
            let frac = cart.iter().map(|p| frac_to_cart(p, &inv)).collect();
            (cart, frac)
        } else {
            let cart = pos.iter().map(|p| frac_to_cart(p, &cell)).collect();
            (cart, pos)
        };

        Ok(Self {
            comment,
            cell,
            ion_types,
            ions_per_type,
            pos_cart,
            pos_frac,
            constraints: if selective { Some(constraints) } else { None },
        })
    }
}


impl fmt::Display for Poscar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.comment)?;
        writeln!(f, "{:19.14}", 1.0)?;
        for row in self.cell.iter() {
            writeln!(f, "  {:21.16} {:21.16} {:21.16}", row[0], row[1], row[2])?;
        }
        writeln!(f, "{}", self.ion_types.iter().map(|t| format!("{:>5}", t)).collect::<String>())?;
        writeln!(f, "{}", self.ions_per_type.iter().map(|n| format!("{:>5}", n)).collect::<String>())?;

        if self.constraints.is_some() {
            writeln!(f, "Selective Dynamics")?;
        }
        writeln!(f, "Direct")?;

        for (i, p) in self.pos_frac.iter().enumerate() {
            write!(f, "  {:19.16} {:19.16} {:19.16}", p[0], p[1], p[2])?;
            if let Some(c) = &self.constraints {
                let flag = |b: bool| if b { "T" } else { "F" };
                write!(f, " {:>3} {:>3} {:>3}", flag(c[i][0]), flag(c[i][1]), flag(c[i][2]))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = "\
Ni Al Va
1.0
  3.52 0.0 0.0
  0.0 3.52 0.0
  0.0 0.0 3.52
  Al Ni Va
  1 2 1
Direct
  0.0 0.0 0.0
  0.5 0.5 0.0
  0.5 0.0 0.5
  0.0 0.5 0.5
";

    #[test]
    fn test_parse_poscar() {
        let pos: Poscar = SAMPLE.parse().unwrap();
        assert_eq!(pos.comment, "Ni Al Va");
        assert_eq!(pos.ion_types, vec!["Al", "Ni", "Va"]);
        assert_eq!(pos.ions_per_type, vec![1, 2, 1]);
        assert_eq!(pos.natoms(), 4);
        assert_eq!(pos.constraints, None);
        assert_relative_eq!(pos.volume(), 3.52f64.powi(3), epsilon = 1E-9);
        assert_relative_eq!(pos.pos_cart[1][0], 1.76);
        assert_eq!(pos.atom_types(), vec!["Al", "Ni", "Ni", "Va"]);
    }

    #[test]
    fn test_sort_and_vacancies() {
        let pos: Poscar = SAMPLE.parse().unwrap();
        let pos = pos.without_vacancies().sorted_by(&["Ni", "Al"]).unwrap();
        assert_eq!(pos.ion_types, vec!["Ni", "Al"]);
        assert_eq!(pos.ions_per_type, vec![2, 1]);
        assert_eq!(pos.pos_frac, vec![[0.5, 0.5, 0.0], [0.5, 0.0, 0.5], [0.0, 0.0, 0.0]]);

        let pos: Poscar = SAMPLE.parse().unwrap();
        assert!(pos.sorted_by(&["Ni", "Al"]).is_err());
    }

    #[test]
    fn test_cartesian_selective() {
        let input = "\
O2 molecule
-1000.0
  1.0 0.0 0.0
  0.0 1.0 0.0
  0.0 0.0 1.0
O
2
Selective dynamics
Cartesian
  0.0 0.0 0.0 F F F
  0.0 0.0 1.2 T T T
";
        let pos: Poscar = input.parse().unwrap();
        assert_relative_eq!(pos.cell[0][0], 10.0, epsilon = 1E-9);
        assert_relative_eq!(pos.pos_cart[1][2], 12.0, epsilon = 1E-9);
        assert_relative_eq!(pos.pos_frac[1][2], 1.2, epsilon = 1E-9);
        assert_eq!(pos.constraints, Some(vec![[false; 3], [true; 3]]));

        let again: Poscar = pos.to_string().parse().unwrap();
        assert_eq!(again.ion_types, pos.ion_types);
        assert_eq!(again.constraints, pos.constraints);
        assert_relative_eq!(again.pos_frac[1][2], 1.2, epsilon = 1E-12);
    }

    #[test]
    fn test_parse_poscar_failed() {
        // VASP 4 style, no symbols
        let input = "x\n1.0\n1 0 0\n0 1 0\n0 0 1\n1\nDirect\n0 0 0\n";
        assert!(input.parse::<Poscar>().is_err());
        // truncated
        assert!(SAMPLE.lines().take(10).collect::<Vec<_>>().join("\n").parse::<Poscar>().is_err());
        // mismatched counts
        let input = SAMPLE.replace("1 2 1", "1 2");
        assert!(input.parse::<Poscar>().is_err());
    }
}
