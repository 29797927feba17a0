#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod browser;
mod cli;
mod credentials;
mod error;
mod extract;
mod fluid;
mod navigator;
mod pipeline;
mod portal;
mod prelude;
mod publisher;
mod quantity;
mod reading;
mod schedule;
mod sensor;
mod session;
mod summary;
mod timings;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command},
    prelude::*,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Run(args) => args.run().await,
        Command::Watch(args) => args.run().await,
    }
}
