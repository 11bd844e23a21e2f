use std::io;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use container_netctl::Opts;

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let default_filter = if opts.verbose {
        "container_netctl=debug"
    } else {
        "container_netctl=info"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    container_netctl::run(opts)?;

    Ok(())
}
