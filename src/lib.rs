pub mod cli;
pub mod commands;
pub mod error;
pub mod input_files;
pub mod relax;
pub mod settings;
pub mod types;
pub mod vasp_parsers;

pub use cli::OptProcess;
pub use types::Result;

pub use error::VaspWrapperError;

pub use settings::{
    read_settings,
    write_settings,
};

pub use input_files::VASP_INPUT_FILE_NAMES;

pub use relax::Relax;

pub use vasp_parsers::{
    incar::Incar,
    kpoints::Kpoints,
    outcar::Outcar,
    poscar::Poscar,
    potcar::Potcar,
    species::SpeciesSettings,
};
