pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod file_storage;
pub mod notify;
pub mod render;
pub mod watch;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use myfuture_core::Session;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args);
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting myfuture CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rcfile.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let storage =
    file_storage::FileStorage::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open storage at {}",
        data_dir.display()
      )
    })?;
  let mut session =
    Session::open(storage);

  let zone =
    datetime::Zone::resolve(&cfg);
  let mut renderer =
    render::Renderer::stdout(
      &cfg, zone
    )?;

  let command =
    cli.command.unwrap_or(
      cli::Command::List {
        filter: None
      }
    );

  commands::dispatch(
    &mut session,
    &cfg,
    &mut renderer,
    command,
    chrono::Utc::now()
  )?;

  info!("done");
  Ok(())
}
