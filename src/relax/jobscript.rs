use std::fmt;

use crate::settings::Settings;


pub const JOB_SCRIPT_NAME: &str = "vaspwrap.sh";


/// Nodes needed for `natoms` atoms, at least one.
pub fn nodes_for(settings: &Settings, natoms: usize) -> u32 {
    let per_node = settings.atom_per_proc as f64 * settings.ppn as f64;
    ((natoms as f64 / per_node).ceil() as u32).max(1)
}


/// PBS batch script running one relaxation.
#[derive(Debug, Clone, PartialEq)]
pub struct JobScript {
    pub name     : String,
    pub queue    : String,
    pub nodes    : u32,
    pub ppn      : u32,
    pub walltime : String,
    pub account  : Option<String>,
    pub pmem     : Option<String>,
    pub priority : i32,
    pub message  : Option<String>,
    pub email    : Option<String>,
    pub qos      : Option<String>,
    pub preamble : Option<String>,
    pub prerun   : Option<String>,
    pub postrun  : Option<String>,
    pub command  : String,
}


impl JobScript {
    pub fn new(settings: &Settings, name: &str, natoms: usize, command: &str) -> Self {
        Self {
            // PBS job names can't contain '/'
            name     : name.replace('/', "."),
            queue    : settings.queue.clone(),
            nodes    : nodes_for(settings, natoms),
            ppn      : settings.ppn,
            walltime : settings.walltime.clone(),
            account  : settings.account.clone(),
            pmem     : settings.pmem.clone(),
            priority : settings.priority,
            message  : settings.message.clone(),
            email    : settings.email.clone(),
            qos      : settings.qos.clone(),
            preamble : None,
            prerun   : settings.prerun.clone(),
            postrun  : settings.postrun.clone(),
            command  : command.to_string(),
        }
    }

    pub fn with_preamble(mut self, preamble: String) -> Self {
        self.preamble = Some(preamble);
        self
    }
}


impl fmt::Display for JobScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#!/bin/bash")?;
        writeln!(f, "#PBS -S /bin/bash")?;
        writeln!(f, "#PBS -N {}", self.name)?;
        writeln!(f, "#PBS -q {}", self.queue)?;
        writeln!(f, "#PBS -l nodes={}:ppn={}", self.nodes, self.ppn)?;
        writeln!(f, "#PBS -l walltime={}", self.walltime)?;
        if let Some(pmem) = &self.pmem       { writeln!(f, "#PBS -l pmem={}", pmem)?; }
        if let Some(qos) = &self.qos         { writeln!(f, "#PBS -l qos={}", qos)?; }
        if let Some(account) = &self.account { writeln!(f, "#PBS -A {}", account)?; }
        if self.priority != 0                { writeln!(f, "#PBS -p {}", self.priority)?; }
        if let Some(message) = &self.message { writeln!(f, "#PBS -m {}", message)?; }
        if let Some(email) = &self.email     { writeln!(f, "#PBS -M {}", email)?; }
        writeln!(f)?;

        if let Some(preamble) = &self.preamble {
            writeln!(f, "{}", preamble.trim_end())?;
        }
        writeln!(f, "cd $PBS_O_WORKDIR")?;
        if let Some(prerun) = &self.prerun {
            writeln!(f, "{}", prerun)?;
        }
        writeln!(f, "{}", self.command)?;
        if let Some(postrun) = &self.postrun {
            writeln!(f, "{}", postrun)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodes_for() {
        let mut s = Settings::example();
        s.ppn = 16;
        s.atom_per_proc = 2;
        assert_eq!(nodes_for(&s, 1), 1);
        assert_eq!(nodes_for(&s, 32), 1);
        assert_eq!(nodes_for(&s, 33), 2);
        assert_eq!(nodes_for(&s, 0), 1);
    }

    #[test]
    fn test_render() {
        let mut s = Settings::example();
        s.account = Some("mat123".to_string());
        s.prerun = Some("module load vasp".to_string());
        let script = JobScript::new(&s, "SCEL1_1_1_1_0_0_0/0", 4, "vaspwrap run .")
            .with_preamble("export OMP_NUM_THREADS=1\n".to_string())
            .to_string();

        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("#PBS -N SCEL1_1_1_1_0_0_0.0\n"));
        assert!(script.contains("#PBS -l nodes=1:ppn=16\n"));
        assert!(script.contains("#PBS -A mat123\n"));
        assert!(script.contains("#PBS -m ae\n"));
        assert!(!script.contains("#PBS -p"));
        assert!(script.ends_with("export OMP_NUM_THREADS=1\ncd $PBS_O_WORKDIR\nmodule load vasp\nvaspwrap run .\n"));
    }
}
