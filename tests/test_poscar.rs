use std::path::PathBuf;

use approx::assert_relative_eq;
use vaspwrap::{
    Result,
    Poscar,
};


macro_rules! get_fpath_in_current_dir {
    ($fname:expr) => {{
        let mut path = PathBuf::from(file!());
        path.pop();
        path.push($fname);
        path
    }}
}


#[test]
fn test_read_poscar() -> Result<()> {
    let fnames = [
        "POSCAR.Ni3Al",
        "POSCAR.O2",
        "POSCAR.NiAl_Va",
    ];
    for f in fnames {
        println!("testing {}", f);
        let pos = Poscar::from_file(&get_fpath_in_current_dir!(f))?;
        let again: Poscar = pos.to_string().parse()?;
        assert_eq!(again.ion_types, pos.ion_types);
        assert_eq!(again.ions_per_type, pos.ions_per_type);
        assert_eq!(again.constraints, pos.constraints);
    }

    let pos = Poscar::from_file(&get_fpath_in_current_dir!("POSCAR.Ni3Al"))?;
    assert_relative_eq!(pos.cell[2][2], 3.57);
    assert_relative_eq!(pos.pos_cart[0][0], 1.785);

    let pos = Poscar::from_file(&get_fpath_in_current_dir!("POSCAR.O2"))?;
    assert_relative_eq!(pos.pos_frac[1][2], 0.621, epsilon = 1E-12);
    Ok(())
}


#[test]
fn test_vacancies_and_merged_groups() -> Result<()> {
    let pos = Poscar::from_file(&get_fpath_in_current_dir!("POSCAR.NiAl_Va"))?
        .without_vacancies()
        .sorted_by(&["Ni", "Al"])?;

    assert_eq!(pos.ion_types, vec!["Ni", "Al"]);
    assert_eq!(pos.ions_per_type, vec![1, 2]);
    assert_eq!(pos.pos_frac, vec![[0.0, 0.0, 0.5], [0.5, 0.5, 0.25], [0.5, 0.5, 0.75]]);
    Ok(())
}


#[test]
#[should_panic]
fn test_read_failed() {
    let fnames = [
        "POSCAR.vasp4",
        "POSCAR.truncated",
    ];
    for f in fnames {
        println!("testing {}", f);
        Poscar::from_file(&get_fpath_in_current_dir!(f)).unwrap();
    }
}
