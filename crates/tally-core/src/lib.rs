pub mod category;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod query;
pub mod render;
pub mod store;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::info;

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;
    info!(verbose = cli.verbose, quiet = cli.quiet, "starting tally CLI");

    let mut cfg = config::Config::load(cli.rc_file.as_deref())?;
    cfg.apply_overrides(
        cli.rc_overrides
            .into_iter()
            .map(|kv| (kv.key, kv.value)),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;

    let slot = store::FileSlot::open(&data_dir).with_context(|| {
        format!("failed to open task storage at {}", data_dir.display())
    })?;
    let mut book = store::TaskBook::open(slot);

    let mut renderer = render::Renderer::new(&cfg)?;
    commands::dispatch(&mut book, &cfg, &mut renderer, cli.command)?;

    info!("done");
    Ok(())
}
