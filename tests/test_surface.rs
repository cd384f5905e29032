use std::{
    any::TypeId,
    path::PathBuf,
};

use vaspwrap::{
    error,
    input_files,
    relax,
    settings,
};


type ReadFn = fn(PathBuf) -> Result<settings::Settings, error::VaspWrapperError>;
type WriteFn = fn(&settings::Settings, PathBuf) -> Result<(), error::VaspWrapperError>;


#[test]
fn test_root_names_are_module_items() {
    assert_eq!(TypeId::of::<vaspwrap::VaspWrapperError>(), TypeId::of::<error::VaspWrapperError>());
    assert_eq!(TypeId::of::<vaspwrap::Relax>(), TypeId::of::<relax::Relax>());

    let a = vaspwrap::read_settings::<PathBuf> as ReadFn;
    let b = settings::read_settings::<PathBuf> as ReadFn;
    assert_eq!(a as usize, b as usize);
    let a = vaspwrap::write_settings::<PathBuf> as WriteFn;
    let b = settings::write_settings::<PathBuf> as WriteFn;
    assert_eq!(a as usize, b as usize);

    assert_eq!(vaspwrap::VASP_INPUT_FILE_NAMES, input_files::VASP_INPUT_FILE_NAMES);
    assert_eq!(vaspwrap::VASP_INPUT_FILE_NAMES, ["INCAR", "KPOINTS", "POSCAR", "POTCAR"]);
}
