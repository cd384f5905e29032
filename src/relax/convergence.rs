use crate::vasp_parsers::{
    incar::Incar,
    outcar::Outcar,
};


/// A relaxation run that took at most this many ionic steps is relaxed.
pub const CONVERGED_IONIC_STEPS: usize = 3;


#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ionic_steps : usize,
    pub energy      : Option<f64>,
}


impl From<&Outcar> for RunSummary {
    fn from(outcar: &Outcar) -> Self {
        Self {
            ionic_steps : outcar.ionic_steps(),
            energy      : outcar.final_energy(),
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Start another relaxation run.
    Continue,
    /// Relaxed, do the final static run.
    Final,
    /// Run limit reached.
    NotConverging,
}


/// The cell shape and volume stay fixed: ISIF < 3 (VASP defaults to 2), or
/// no ionic relaxation at all.
pub fn is_constant_volume(incar: &Incar) -> bool {
    incar.get_i32("ISIF").unwrap_or(2) < 3
        || incar.get_i32("NSW").unwrap_or(0) == 0
        || incar.get_i32("IBRION") == Some(-1)
}


/// Decide what follows the completed runs `runs`.
pub fn next_step(runs: &[RunSummary], constant_volume: bool, run_limit: usize, nrg_convergence: Option<f64>) -> NextStep {
    let last = match runs.last() {
        Some(last) => last,
        None => return NextStep::Continue,
    };

    if constant_volume {
        return NextStep::Final;
    }

    if runs.len() >= 2 {
        let prev = &runs[runs.len() - 2];
        if let (Some(de), Some(e0), Some(e1)) = (nrg_convergence, prev.energy, last.energy) {
            if (e1 - e0).abs() < de {
                return NextStep::Final;
            }
        }
        if last.ionic_steps <= CONVERGED_IONIC_STEPS {
            return NextStep::Final;
        }
    }

    if runs.len() >= run_limit {
        NextStep::NotConverging
    } else {
        NextStep::Continue
    }
}
