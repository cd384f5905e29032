pub mod setup;
pub mod run;
pub mod submit;
pub mod status;
pub mod finalize;
pub mod settings;
