use std::{
    fmt,
    fs,
    path::Path,
    str::FromStr,
};

use anyhow::Context;
use indexmap::IndexMap;

use crate::{
    error::VaspWrapperError,
    types::Result,
};


/// INCAR tags in file order. Tag names are stored upper-cased.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Incar {
    tags: IndexMap<String, String>,
}


impl Incar {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let txt = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read INCAR {:?}", path.as_ref()))?;
        txt.parse()
    }

    pub fn to_file(&self, path: &(impl AsRef<Path> + ?Sized)) -> Result<()> {
        fs::write(path.as_ref(), self.to_string())
            .with_context(|| format!("Failed to write INCAR {:?}", path.as_ref()))
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.tags.get(&tag.to_ascii_uppercase()).map(String::as_str)
    }

    /// Integer value of `tag`, `None` if absent or not an integer.
    pub fn get_i32(&self, tag: &str) -> Option<i32> {
        self.get(tag).and_then(|v| v.parse().ok())
    }

    pub fn set(&mut self, tag: &str, value: impl ToString) -> &mut Self {
        self.tags.insert(tag.to_ascii_uppercase(), value.to_string());
        self
    }

    pub fn remove(&mut self, tag: &str) -> Option<String> {
        self.tags.shift_remove(&tag.to_ascii_uppercase())
    }

    /// Overwrite with every tag of `other`; new tags are appended.
    pub fn merge(&mut self, other: &Incar) -> &mut Self {
        for (k, v) in other.tags.iter() {
            self.tags.insert(k.clone(), v.clone());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}


impl FromStr for Incar {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut tags = IndexMap::new();

        for (iline, line) in s.lines().enumerate() {
            let line = line.split(|c: char| c == '!' || c == '#')
                .next()
                .unwrap_or("");

            for stmt in line.split(';').map(str::trim).filter(|x| !x.is_empty()) {
                let (key, value) = stmt.split_once('=')
                    .ok_or_else(|| VaspWrapperError::parse(
                            "INCAR", format!("line {}: expected `TAG = value`, got {:?}", iline + 1, stmt)))?;

                let key = key.trim().to_ascii_uppercase();
                if key.is_empty() || key.contains(char::is_whitespace) {
                    return Err(VaspWrapperError::parse(
                            "INCAR", format!("line {}: invalid tag name {:?}", iline + 1, key)).into());
                }
                let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
                tags.insert(key, value);
            }
        }

        Ok(Self { tags })
    }
}


impl fmt::Display for Incar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.tags.iter() {
            writeln!(f, "{:<8} = {}", k, v)?;
        }
        Ok(())
    }
}


/// Write per-atom values in the `n*value` short form, merging neighbouring
/// runs with the same value.
///
/// `[(2, "2.0"), (1, "2.0"), (4, "0")]` gives `"3*2.0 4*0"`.
pub fn compress_per_atom<S: AsRef<str>>(runs: &[(usize, S)]) -> String {
    let mut merged: Vec<(usize, &str)> = vec![];
    for (n, v) in runs.iter().filter(|(n, _)| *n > 0) {
        match merged.last_mut() {
            Some(last) if last.1 == v.as_ref() => last.0 += n,
            _ => merged.push((*n, v.as_ref())),
        }
    }

    merged.into_iter()
        .map(|(n, v)| if n == 1 { v.to_string() } else { format!("{}*{}", n, v) })
        .collect::<Vec<_>>()
        .join(" ")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_incar() {
        let input = r#"SYSTEM = Ni3Al   relaxation
 ENCUT = 450 ! cutoff
prec=Accurate; ISMEAR = 1 ; SIGMA = 0.1
# whole line comment

  IBRION =    2
isif = 3
"#;
        let incar: Incar = input.parse().unwrap();
        assert_eq!(incar.len(), 7);
        assert_eq!(incar.get("SYSTEM"), Some("Ni3Al relaxation"));
        assert_eq!(incar.get("encut"), Some("450"));
        assert_eq!(incar.get("PREC"), Some("Accurate"));
        assert_eq!(incar.get_i32("ISIF"), Some(3));
        assert_eq!(incar.get_i32("PREC"), None);

        let keys = incar.iter().map(|(k, _)| k).collect::<Vec<_>>();
        assert_eq!(keys, vec!["SYSTEM", "ENCUT", "PREC", "ISMEAR", "SIGMA", "IBRION", "ISIF"]);
    }

    #[test]
    fn test_parse_incar_failed() {
        assert!("ENCUT 450".parse::<Incar>().is_err());
        assert!(" = 450".parse::<Incar>().is_err());
        assert!("EN CUT = 450".parse::<Incar>().is_err());
    }

    #[test]
    fn test_merge_and_display() {
        let mut a: Incar = "ENCUT = 400\nISIF = 3".parse().unwrap();
        let b: Incar = "isif = 2\nNSW = 0".parse().unwrap();
        a.merge(&b);
        a.remove("encut");
        a.set("ibrion", -1);
        assert_eq!(a.to_string(), "ISIF     = 2\nNSW      = 0\nIBRION   = -1\n");
        assert_eq!(a.to_string().parse::<Incar>().unwrap(), a);
    }

    #[test]
    fn test_compress_per_atom() {
        assert_eq!(compress_per_atom(&[(2, "2.0"), (1, "2.0"), (4, "0")]), "3*2.0 4*0");
        assert_eq!(compress_per_atom(&[(1, "1"), (0, "5"), (1, "2")]), "1 2");
        assert_eq!(compress_per_atom::<&str>(&[]), "");
    }
}
