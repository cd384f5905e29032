use std::path::PathBuf;

use tempdir::TempDir;
use vaspwrap::{
    read_settings,
    write_settings,
    settings::Settings,
    VaspWrapperError,
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
fn test_read_settings() {
    let settings = read_settings(get_fpath_in_current_dir!("relax.json")).unwrap();

    assert_eq!(settings.queue, "batch");
    assert_eq!(settings.ppn, 16);
    assert_eq!(settings.atom_per_proc, 2);
    assert_eq!(settings.walltime, "48:00:00");
    assert_eq!(settings.account.as_deref(), Some("mat123"));
    assert_eq!(settings.priority, 5);
    assert_eq!(settings.ncore, Some(4));
    assert_eq!(settings.npar, None);
    assert_eq!(settings.nrg_convergence, Some(0.001));
    assert_eq!(settings.final_incar, Some(PathBuf::from("INCAR.final")));
    assert_eq!(settings.initial_incar, None);
    assert_eq!(settings.copy_files, vec!["WAVECAR"]);
    assert_eq!(settings.remove, vec!["CHG", "CHGCAR", "WAVECAR"]);

    // defaults
    assert_eq!(settings.run_limit, 10);
    assert_eq!(settings.compress, vec!["OUTCAR"]);
    assert_eq!(settings.submit_cmd, "qsub");
    assert_eq!(settings.vasp_command(32), "mpirun -np 32 vasp_std");
}


#[test]
fn test_read_settings_failed() {
    match read_settings(get_fpath_in_current_dir!("relax_missing_walltime.json")) {
        Err(VaspWrapperError::MissingSetting(key)) => assert_eq!(key, "walltime"),
        other => panic!("unexpected result: {:?}", other),
    }

    assert!(matches!(read_settings(get_fpath_in_current_dir!("relax_npar_ncore.json")),
                     Err(VaspWrapperError::InvalidSetting { .. })));
    assert!(matches!(read_settings(get_fpath_in_current_dir!("relax_broken.json")),
                     Err(VaspWrapperError::Settings(_))));
    assert!(matches!(read_settings(get_fpath_in_current_dir!("no_such_file.json")),
                     Err(VaspWrapperError::Settings(_))));
}


#[test]
fn test_write_settings() {
    let tmpdir = TempDir::new("vaspwrap_test").unwrap();
    let settings = read_settings(get_fpath_in_current_dir!("relax.json")).unwrap();

    for name in ["relax.json", "relax.toml"] {
        let path = tmpdir.path().join(name);
        write_settings(&settings, &path).unwrap();
        assert_eq!(read_settings(&path).unwrap(), settings);
    }

    let json = std::fs::read_to_string(tmpdir.path().join("relax.json")).unwrap();
    assert!(json.contains(r#""final": "INCAR.final""#));
    assert!(!json.contains("npar"));

    let example = tmpdir.path().join("example.json");
    write_settings(&Settings::example(), &example).unwrap();
    assert_eq!(read_settings(&example).unwrap(), Settings::example());
}
