//! Structural relaxation of one configuration.
//!
//! The calculation directory `calctype.<ct>` of a configuration holds the
//! generated input, `status.json`, the runs `run.0`, `run.1`, ... and a
//! final static run `run.final`. Once complete, `finalize` writes the
//! relaxed structure and energy to `properties.calc.json`.
pub mod convergence;
pub mod jobscript;
pub mod runner;
pub mod status;

use std::{
    fs,
    io::{
        self,
        Write,
    },
    path::{
        Path,
        PathBuf,
    },
    process::Command,
};

use anyhow::{
    bail,
    Context,
};
use flate2::{
    Compression,
    write::GzEncoder,
};
use log::{
    debug,
    info,
    warn,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::VaspWrapperError,
    input_files::{
        InputFileSet,
        ProjectLayout,
        VASP_INPUT_FILE_NAMES,
        crawl_required,
    },
    settings::{
        read_settings,
        Settings,
        SETTINGS_FILE_NAME,
    },
    types::{
        Result,
        Mat33,
        MatX3,
    },
    vasp_parsers::{
        incar::{
            compress_per_atom,
            Incar,
        },
        kpoints::Kpoints,
        outcar::Outcar,
        poscar::Poscar,
        potcar::Potcar,
        species::SpeciesSettings,
    },
};

pub use self::{
    convergence::{
        NextStep,
        RunSummary,
    },
    jobscript::JobScript,
    runner::{
        CommandRunner,
        VaspRunner,
    },
    status::{
        RelaxStatus,
        StatusRecord,
    },
};


pub const FINAL_RUN_DIR: &str = "run.final";
pub const PROPERTIES_FILE_NAME: &str = "properties.calc.json";


/// Relaxed structure and energy, written to `properties.calc.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaxedProperties {
    pub natoms          : usize,
    pub ion_types       : Vec<String>,
    pub ions_per_type   : Vec<usize>,
    pub atom_type       : Vec<String>,
    pub coord_mode      : String,
    pub relaxed_lattice : Mat33<f64>,
    pub relaxed_basis   : MatX3<f64>,
    pub relaxed_energy  : f64,
    pub nruns           : usize,
}


#[derive(Debug, Clone)]
pub struct Relax {
    pub layout   : ProjectLayout,
    pub settings : Settings,
    pub inputs   : InputFileSet,
}


fn is_complete(rundir: &Path) -> bool {
    Outcar::from_file(&rundir.join("OUTCAR"))
        .map(|o| o.complete)
        .unwrap_or(false)
}


fn is_nonempty_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}


fn gzip_file(path: &Path) -> Result<()> {
    let mut gz = path.as_os_str().to_owned();
    gz.push(".gz");

    let mut src = fs::File::open(path)?;
    let mut enc = GzEncoder::new(fs::File::create(&gz)?, Compression::default());
    io::copy(&mut src, &mut enc)?;
    enc.finish()?.flush()?;
    fs::remove_file(path)?;
    Ok(())
}


impl Relax {
    /// Load settings and locate the templates for the configuration in `configdir`.
    pub fn new(configdir: &Path, calctype: &str) -> Result<Self> {
        let layout = ProjectLayout::discover(configdir, calctype)?;
        let dirs = layout.settings_dirs();

        let settings_file = crawl_required(&dirs, SETTINGS_FILE_NAME)?;
        info!("Reading settings from {:?}", &settings_file);
        let settings = read_settings(&settings_file)?;
        let inputs = InputFileSet::locate(&dirs)?;

        Ok(Self::from_parts(layout, settings, inputs))
    }

    pub fn from_parts(layout: ProjectLayout, settings: Settings, inputs: InputFileSet) -> Self {
        Self { layout, settings, inputs }
    }

    pub fn configname(&self) -> &str {
        &self.layout.configname
    }

    pub fn calcdir(&self) -> PathBuf {
        self.layout.calcdir()
    }

    pub fn status(&self) -> Result<StatusRecord> {
        StatusRecord::load(&self.calcdir())
    }

    pub fn set_status(&self, status: RelaxStatus, jobid: Option<String>) -> Result<()> {
        debug!("{}: status -> {}", self.configname(), status);
        StatusRecord { status, jobid }.save(&self.calcdir())
    }

    /// Relative paths in the settings are looked up in the settings directories.
    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        crawl_required(&self.layout.settings_dirs(), &path.to_string_lossy())
    }

    /// Configuration structure, vacancies removed and atoms grouped in SPECIES order.
    pub fn structure(&self, species: &SpeciesSettings) -> Result<Poscar> {
        Poscar::from_file(&self.layout.structure_file())?
            .without_vacancies()
            .sorted_by(&species.names())
    }

    /// Write INCAR, KPOINTS, POSCAR, POTCAR and the extra input files into the calculation directory.
    pub fn setup(&self) -> Result<()> {
        let calcdir = self.calcdir();
        info!("Setting up {} in {:?}", self.configname(), &calcdir);
        fs::create_dir_all(&calcdir)
            .with_context(|| format!("Failed to create {:?}", &calcdir))?;

        let species = SpeciesSettings::from_file(&self.inputs.species)?;
        let poscar = self.structure(&species)?;
        if poscar.natoms() == 0 {
            bail!(VaspWrapperError::parse("POSCAR", format!("{} has no atoms", self.configname())));
        }

        // INCAR
        let mut incar = Incar::from_file(&self.inputs.incar)?;
        incar.set("SYSTEM", self.configname());
        for tag in species.tags.iter() {
            let runs = poscar.ion_types.iter()
                .zip(poscar.ions_per_type.iter())
                .map(|(t, &n)| {
                    let value = species.get(t)
                        .and_then(|s| s.tags.get(tag))
                        .cloned()
                        .unwrap_or_default();
                    (n, value)
                })
                .collect::<Vec<_>>();
            incar.set(tag, compress_per_atom(&runs));
        }
        if let Some(npar) = self.settings.npar {
            incar.set("NPAR", npar);
            incar.remove("NCORE");
        }
        if let Some(ncore) = self.settings.ncore {
            incar.set("NCORE", ncore);
            incar.remove("NPAR");
        }
        if let Some(kpar) = self.settings.kpar {
            incar.set("KPAR", kpar);
        }
        incar.to_file(&calcdir.join("INCAR"))?;

        // KPOINTS
        let kpoints = Kpoints::from_file(&self.inputs.kpoints)?;
        let kpoints = match &self.inputs.prim_poscar {
            Some(prim) => kpoints.scale_to(&Poscar::from_file(prim)?, &poscar),
            None => {
                debug!("No reference POSCAR, KPOINTS used as is");
                kpoints
            },
        };
        kpoints.to_file(&calcdir.join("KPOINTS"))?;

        // POSCAR and POTCAR
        poscar.to_file(&calcdir.join("POSCAR"))?;
        Potcar::from_species(&species, &poscar.ion_types)?
            .to_file(&calcdir.join("POTCAR"))?;

        let dirs = self.layout.settings_dirs();
        for name in self.settings.extra_input_files.iter() {
            let src = crawl_required(&dirs, name)?;
            fs::copy(&src, calcdir.join(name))
                .with_context(|| format!("Failed to copy {:?}", &src))?;
        }

        if !calcdir.join(status::STATUS_FILE_NAME).is_file() {
            self.set_status(RelaxStatus::NotSubmitted, None)?;
        }
        Ok(())
    }

    fn is_setup(&self) -> bool {
        let calcdir = self.calcdir();
        VASP_INPUT_FILE_NAMES.iter().all(|f| calcdir.join(f).is_file())
    }

    /// Relaxation run directories `run.0`, `run.1`, ... in order.
    pub fn rundirs(&self) -> Result<Vec<PathBuf>> {
        let calcdir = self.calcdir();
        if !calcdir.is_dir() {
            return Ok(vec![]);
        }

        let mut runs = fs::read_dir(&calcdir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|n| n.strip_prefix("run."))
                    .and_then(|n| n.parse::<usize>().ok())
            })
            .collect::<Vec<_>>();
        runs.sort_unstable();

        // only the contiguous sequence from run.0 counts
        Ok(runs.into_iter()
           .enumerate()
           .take_while(|(i, n)| i == n)
           .map(|(i, _)| calcdir.join(format!("run.{}", i)))
           .collect())
    }

    fn command(&self) -> Result<String> {
        let species = SpeciesSettings::from_file(&self.inputs.species)?;
        let natoms = self.structure(&species)?.natoms();
        let ncpus = jobscript::nodes_for(&self.settings, natoms) * self.settings.ppn;
        Ok(self.settings.vasp_command(ncpus))
    }

    /// Fill `rundir` with input, taking the structure and kept files from `prev`.
    fn prepare_run(&self, rundir: &Path, prev: Option<&Path>, overrides: Option<&Incar>) -> Result<()> {
        let calcdir = self.calcdir();
        fs::create_dir_all(rundir)
            .with_context(|| format!("Failed to create {:?}", rundir))?;

        let mut names = vec!["KPOINTS", "POTCAR"];
        names.extend(self.settings.extra_input_files.iter().map(String::as_str));
        for name in names {
            fs::copy(calcdir.join(name), rundir.join(name))
                .with_context(|| format!("Failed to copy {} into {:?}", name, rundir))?;
        }

        let mut incar = Incar::from_file(&calcdir.join("INCAR"))?;
        if let Some(overrides) = overrides {
            incar.merge(overrides);
        }
        incar.to_file(&rundir.join("INCAR"))?;

        let contcar = prev.map(|p| p.join("CONTCAR")).filter(|p| is_nonempty_file(p));
        let poscar = match contcar {
            Some(contcar) => {
                debug!("Continuing from {:?}", &contcar);
                contcar
            },
            None => calcdir.join("POSCAR"),
        };
        fs::copy(&poscar, rundir.join("POSCAR"))
            .with_context(|| format!("Failed to copy {:?}", &poscar))?;

        if let Some(prev) = prev {
            for name in self.settings.copy_files.iter() {
                if prev.join(name).is_file() {
                    fs::copy(prev.join(name), rundir.join(name))?;
                }
            }
            for name in self.settings.move_files.iter() {
                if prev.join(name).is_file() {
                    fs::rename(prev.join(name), rundir.join(name))?;
                }
            }
        }
        Ok(())
    }

    fn overrides(&self, path: &Option<PathBuf>) -> Result<Option<Incar>> {
        path.as_ref()
            .map(|p| self.resolve(p).and_then(|p| Incar::from_file(&p)))
            .transpose()
    }

    /// Delete scratch files and compress the kept ones.
    fn cleanup(&self, rundir: &Path, compress: bool) -> Result<()> {
        let keep = |name: &String| self.settings.copy_files.contains(name) || self.settings.move_files.contains(name);

        for name in self.settings.remove.iter().filter(|n| !keep(*n)) {
            let path = rundir.join(name);
            if path.is_file() {
                fs::remove_file(&path)?;
            }
        }

        if compress {
            for name in self.settings.compress.iter().filter(|n| !keep(*n)) {
                let path = rundir.join(name);
                if path.is_file() {
                    gzip_file(&path)
                        .with_context(|| format!("Failed to compress {:?}", &path))?;
                }
            }
        }
        Ok(())
    }

    fn execute(&self, runner: &dyn VaspRunner, rundir: &Path, command: &str,
               is_final: bool, jobid: &Option<String>) -> Result<RunSummary> {
        if let Err(e) = runner.run(rundir, command) {
            self.set_status(RelaxStatus::Failed, jobid.clone())?;
            return Err(e);
        }

        let outcar = match Outcar::from_file(&rundir.join("OUTCAR")) {
            Ok(outcar) if outcar.complete => outcar,
            Ok(_) => {
                self.set_status(RelaxStatus::Failed, jobid.clone())?;
                bail!(VaspWrapperError::VaspFailed {
                    rundir: rundir.to_path_buf(),
                    reason: "OUTCAR is incomplete".to_string(),
                });
            },
            Err(e) => {
                self.set_status(RelaxStatus::Failed, jobid.clone())?;
                bail!(VaspWrapperError::VaspFailed {
                    rundir: rundir.to_path_buf(),
                    reason: format!("{:#}", e),
                });
            },
        };

        let summary = RunSummary::from(&outcar);
        info!("{:?} finished: {} ionic steps, E0 = {:?} eV", rundir, summary.ionic_steps, summary.energy);
        self.cleanup(rundir, !is_final)?;
        Ok(summary)
    }

    /// Run VASP until relaxed, then the final static run.
    ///
    /// An incomplete last run is re-run in place, so an interrupted
    /// relaxation can be resumed by calling this again.
    pub fn run(&self, runner: &dyn VaspRunner) -> Result<RelaxStatus> {
        if !self.is_setup() {
            self.setup()?;
        }
        let jobid = self.status()?.jobid;
        self.set_status(RelaxStatus::Started, jobid.clone())?;

        let calcdir = self.calcdir();
        let command = self.command()?;
        let constant_volume = convergence::is_constant_volume(&Incar::from_file(&calcdir.join("INCAR"))?);
        let initial = self.overrides(&self.settings.initial_incar)?;

        loop {
            let rundirs = self.rundirs()?;

            if let Some(last) = rundirs.last() {
                if !is_complete(last) {
                    warn!("{:?} is incomplete, running it again", last);
                    self.execute(runner, last, &command, false, &jobid)?;
                    continue;
                }
            }

            let summaries = rundirs.iter()
                .map(|d| Outcar::from_file(&d.join("OUTCAR")).map(|o| RunSummary::from(&o)))
                .collect::<Result<Vec<_>>>()?;

            match convergence::next_step(&summaries, constant_volume,
                                         self.settings.run_limit, self.settings.nrg_convergence) {
                NextStep::Continue => {
                    let rundir = calcdir.join(format!("run.{}", rundirs.len()));
                    info!("{}: starting {:?}", self.configname(), &rundir);
                    let overrides = if rundirs.is_empty() { initial.as_ref() } else { None };
                    self.prepare_run(&rundir, rundirs.last().map(PathBuf::as_path), overrides)?;
                    self.execute(runner, &rundir, &command, false, &jobid)?;
                },

                NextStep::Final => {
                    let rundir = calcdir.join(FINAL_RUN_DIR);
                    if !is_complete(&rundir) {
                        info!("{}: relaxed, starting final run", self.configname());
                        let mut overrides = Incar::default();
                        overrides.set("NSW", 0).set("IBRION", -1);
                        if let Some(f) = self.overrides(&self.settings.final_incar)? {
                            overrides.merge(&f);
                        }
                        self.prepare_run(&rundir, rundirs.last().map(PathBuf::as_path), Some(&overrides))?;
                        self.execute(runner, &rundir, &command, true, &jobid)?;
                    }
                    self.set_status(RelaxStatus::Complete, jobid)?;
                    return Ok(RelaxStatus::Complete);
                },

                NextStep::NotConverging => {
                    warn!("{}: not converging after {} runs", self.configname(), rundirs.len());
                    self.set_status(RelaxStatus::NotConverging, jobid)?;
                    bail!(VaspWrapperError::NotConverging(rundirs.len()));
                },
            }
        }
    }

    /// Write the job script and hand it to the batch system, returning the job id.
    pub fn submit(&self, force: bool) -> Result<Option<String>> {
        let record = self.status()?;
        if !force && record.status.is_busy_or_done() {
            bail!(VaspWrapperError::Submit(format!("{} is already {}", self.configname(), record.status)));
        }

        if !self.is_setup() {
            self.setup()?;
        }

        let species = SpeciesSettings::from_file(&self.inputs.species)?;
        let natoms = self.structure(&species)?.natoms();
        let command = format!("vaspwrap run {:?} --calctype {}", self.layout.configdir(), self.layout.calctype);
        let mut script = JobScript::new(&self.settings, self.configname(), natoms, &command);
        if let Some(preamble) = &self.settings.preamble {
            let path = self.resolve(preamble)?;
            script = script.with_preamble(fs::read_to_string(&path)
                                          .with_context(|| format!("Failed to read preamble {:?}", &path))?);
        }

        let calcdir = self.calcdir();
        let script_path = calcdir.join(jobscript::JOB_SCRIPT_NAME);
        fs::write(&script_path, script.to_string())?;

        let mut words = self.settings.submit_cmd.split_whitespace();
        let program = words.next()
            .ok_or_else(|| VaspWrapperError::Submit("empty submit_cmd".to_string()))?;
        info!("Submitting {} with `{}`", self.configname(), &self.settings.submit_cmd);
        let output = Command::new(program)
            .args(words)
            .arg(&script_path)
            .current_dir(&calcdir)
            .output()
            .map_err(|e| VaspWrapperError::Submit(format!("cannot launch {}: {}", program, e)))?;

        if !output.status.success() {
            bail!(VaspWrapperError::Submit(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }

        let jobid = String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .next()
            .map(str::to_string);
        self.set_status(RelaxStatus::Submitted, jobid.clone())?;
        Ok(jobid)
    }

    /// Collect the relaxed structure and energy of a complete relaxation.
    pub fn finalize(&self) -> Result<RelaxedProperties> {
        let record = self.status()?;
        if record.status != RelaxStatus::Complete {
            bail!("{} is {}, only complete relaxations can be finalized", self.configname(), record.status);
        }

        let rundir = self.calcdir().join(FINAL_RUN_DIR);
        let outcar = Outcar::from_file(&rundir.join("OUTCAR"))?;
        let contcar = rundir.join("CONTCAR");
        let structure = if is_nonempty_file(&contcar) {
            Poscar::from_file(&contcar)?
        } else {
            Poscar::from_file(&rundir.join("POSCAR"))?
        };

        if outcar.nions != structure.natoms() {
            bail!(VaspWrapperError::parse("OUTCAR", format!("{:?} has {} ions but the relaxed structure has {} atoms",
                                                             &rundir, outcar.nions, structure.natoms())));
        }

        let relaxed_energy = outcar.final_energy()
            .ok_or_else(|| VaspWrapperError::parse("OUTCAR", format!("no energy in {:?}", &rundir)))?;

        let props = RelaxedProperties {
            natoms          : structure.natoms(),
            atom_type       : structure.atom_types().into_iter().map(str::to_string).collect(),
            ion_types       : structure.ion_types.clone(),
            ions_per_type   : structure.ions_per_type.clone(),
            coord_mode      : "direct".to_string(),
            relaxed_lattice : structure.cell,
            relaxed_basis   : structure.pos_frac.clone(),
            relaxed_energy,
            nruns           : self.rundirs()?.len(),
        };

        let path = self.calcdir().join(PROPERTIES_FILE_NAME);
        fs::write(&path, serde_json::to_string_pretty(&props)? + "\n")
            .with_context(|| format!("Failed to write {:?}", &path))?;
        info!("{}: properties written to {:?}", self.configname(), &path);

        Ok(props)
    }
}
