pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dates;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod task;
pub mod tasks;
pub mod view;

use std::ffi::OsString;

use anyhow::{
  Context,
  anyhow
};
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::filter::{
  FilterAction,
  FilterState
};
use crate::task::TaskStatus;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
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
    "starting docket"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.docketrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .iter()
        .map(|kv| {
          (kv.key.clone(), kv.value.clone())
        })
    )
  );

  let source_path = match &cli.source {
    | Some(path) => {
      config::expand_tilde(path)
    }
    | None => cfg
      .get_path("source.location")
      .ok_or_else(|| {
        anyhow!(
          "no task source: pass --source \
           or set source.location"
        )
      })?
  };
  let records =
    source::load_records(&source_path)
      .with_context(|| {
        format!(
          "failed to load tasks from {}",
          source_path.display()
        )
      })?;

  let tz = datetime::resolve_timezone(&cfg);
  let today =
    datetime::today_in(tz, Utc::now());
  let as_of = datetime::parse_as_of(
    &cli.as_of, today
  )?;

  let filter = filter_from_cli(&cli)?;
  let options = pipeline::DeriveOptions {
    week_markers: cfg
      .get_flag("markers")?
      .unwrap_or(true),
    today_marker: cli.today_marker
  };

  let view = pipeline::derive(
    records, &filter, as_of, options
  )?;

  let kind = cli::resolve_view(&cli, &cfg)?;
  let renderer =
    render::Renderer::new(&cfg)?;
  commands::dispatch(
    kind, &view, &renderer
  )?;

  info!("done");
  Ok(())
}

/// Folds the command-line selection into a filter state, starting from the
/// default selection of every data status.
fn filter_from_cli(
  cli: &cli::GlobalCli
) -> anyhow::Result<FilterState> {
  let mut actions = Vec::new();
  if let Some(project) = &cli.project {
    actions.push(FilterAction::SetProject(
      project.clone()
    ));
  }
  if let Some(context) = &cli.context {
    actions.push(FilterAction::SetContext(
      context.clone()
    ));
  }
  for raw in &cli.statuses {
    let status = TaskStatus::parse(raw)
      .ok_or_else(|| {
        anyhow!("unknown status: {raw}")
      })?;
    actions.push(
      FilterAction::ToggleStatus(status)
    );
  }

  let state =
    FilterState::default().reduce_all(actions);
  debug!(?state, "resolved filter");
  Ok(state)
}
