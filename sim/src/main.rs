//! A command-line driver for `rt-kernel`: elaborates a design unit and runs
//! it against the kernel until its event queue empties.

mod cli;
mod demo;

use clap::Parser;
use miette::IntoDiagnostic;
use rt_kernel::{rt_exec, StderrSink};

fn main() -> miette::Result<()> {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let library = demo::ClockLibrary::new();
    let mut loader = demo::ClockLoader::new(args.half_period_fs, args.toggles);

    rt_exec(&library, &args.top, &mut loader, Box::new(StderrSink), args.trace).into_diagnostic()?;

    tracing::info!("simulation finished");
    Ok(())
}
