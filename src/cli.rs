use std::sync::OnceLock;
use clap::{
    Parser,
    builder::styling::{
        AnsiColor,
        Effects,
        Styles,
    },
};
use enum_dispatch::enum_dispatch;

use crate::{
    types::Result,
    commands::{
        setup::Setup,
        run::Run,
        submit::Submit,
        status::Status,
        finalize::Finalize,
        settings::Settings,
    },
};


pub fn get_style() -> Styles {
    static INSTANCE: OnceLock<Styles> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        Styles::styled()
            .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
            .usage(AnsiColor::Green.on_default()   | Effects::BOLD)
            .literal(AnsiColor::Green.on_default() | Effects::BOLD)
            .placeholder(AnsiColor::BrightBlue.on_default())
            .error(AnsiColor::BrightRed.on_default())
            .valid(AnsiColor::BrightYellow.on_default())
    }).to_owned()
}


#[enum_dispatch]
pub trait OptProcess {
    fn process(&self) -> Result<()>;
}


#[enum_dispatch(OptProcess)]
#[derive(Debug, Parser)]
#[command(name = "vaspwrap",
            about = r"Set up, run and collect VASP structural relaxations of project configurations.
Settings are read from `relax.json` in `settings/calctype.<CALCTYPE>/` of the project.",
            version,
            author = "@Ionizing github.com/Ionizing",
            styles = get_style()
            )]
enum Opt {
    Setup,

    Run,

    Submit,

    Status,

    Finalize,

    Settings,
}


pub fn run() -> Result<()> {
    Opt::parse().process()
}
