pub mod cli;
pub mod codec;
pub mod commands;
pub mod config;
pub mod filter;
pub mod model;
pub mod render;
pub mod storage;
pub mod store;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::info;

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting protodo CLI"
    );

    let mut cfg = config::Config::load(cli.protodorc.as_deref())?;
    cfg.apply_overrides(
        cli.rc_overrides
            .into_iter()
            .map(|kv| (kv.key, kv.value)),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;

    let slots = storage::SlotStore::open(&data_dir)
        .with_context(|| format!("failed to open storage at {}", data_dir.display()))?;
    let mut store = store::Store::open(slots).context("failed to load persisted state")?;

    let mut renderer = render::Renderer::new(&cfg)?;

    commands::dispatch(&mut store, &mut renderer, cli.command)?;

    info!("done");
    Ok(())
}
