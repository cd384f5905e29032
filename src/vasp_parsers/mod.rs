pub mod incar;
pub mod kpoints;
pub mod outcar;
pub mod poscar;
pub mod potcar;
pub mod species;
