mod browser;
mod home_assistant;
mod run;
mod timings;
mod watch;

use clap::{Parser, Subcommand};

pub use self::{run::RunArgs, watch::WatchArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in, publish the consumptions, and exit.
    #[clap(name = "run")]
    Run(Box<RunArgs>),

    /// Run now and then again on every interval tick.
    #[clap(name = "watch")]
    Watch(Box<WatchArgs>),
}
