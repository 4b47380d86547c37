//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - locates (or downloads) the dataset
//! - runs the ripple or completions pipeline
//! - prints reports/plots
//! - writes optional exports

use std::ffi::OsString;
use std::path::Path;

use clap::Parser;
use tracing::warn;

use crate::cli::{Cli, Command, CompletionsArgs, FetchArgs, RippleArgs};
use crate::data::{DatasetSource, Fetcher};
use crate::domain::{AnimationConfig, CompletionsConfig, DEFAULT_REGIONS, DatasetKind, RippleConfig};
use crate::error::AppError;

pub mod pipeline;

const HTML_TITLE: &str = "London housing completions";

/// Entry point for the `housing` binary.
pub fn run() -> Result<(), AppError> {
    let cli = parse_cli(std::env::args_os(), None);

    match cli.command {
        Command::Fetch(args) => handle_fetch(args),
        Command::Ripple(args) => handle_ripple(args),
        Command::Completions(args) => handle_completions(args),
    }
}

/// Load `.env` into the environment, then parse `argv`.
///
/// Clap reads `env = ...` fallbacks while parsing, so `.env` must be loaded first.
/// `env_file` overrides the usual `.env` lookup from the working directory.
fn parse_cli<I, T>(argv: I, env_file: Option<&Path>) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let loaded = match env_file {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    if let Err(e) = loaded {
        if !e.not_found() {
            warn!(error = %e, "ignoring unreadable .env file");
        }
    }
    Cli::parse_from(argv)
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let source = DatasetSource::resolve(args.dataset, args.url, args.cache_dir);
    let path = Fetcher::new().fetch(&source, args.refresh)?;
    println!("{}: {}", args.dataset.display_name(), path.display());
    Ok(())
}

fn handle_ripple(args: RippleArgs) -> Result<(), AppError> {
    let config = ripple_config_from_args(&args)?;
    let animation = animation_config_from_args(&args)?;

    let source = DatasetSource::resolve(DatasetKind::Hpi, args.source.url.clone(), args.source.cache_dir.clone());
    let path = pipeline::locate_dataset(args.source.input.as_deref(), &source, args.source.refresh)?;
    let run = pipeline::run_ripple(&path, &config)?;

    println!("{}", crate::report::format_ripple_summary(&run.prices, &run.ripple, &config));
    println!(
        "{}",
        crate::report::format_table(&crate::report::ripple_latest_table(&run.ripple))
    );

    if !args.no_plot {
        println!("{}", crate::plot::render_ripple_plot(&run.ripple, args.width, args.height));
    }

    // Optional exports.
    if let Some(path) = &args.export {
        crate::io::write_ripple_wide_csv(path, &run.ripple)?;
    }
    if let Some(path) = &args.export_long {
        crate::io::write_ripple_long_csv(path, &run.ripple.rows)?;
    }
    if let Some(animation) = &animation {
        let frames = crate::plot::render_ripple_gif(&run.ripple, animation)?;
        println!("Animation: {} ({frames} frames)", animation.path.display());
    }

    Ok(())
}

fn handle_completions(args: CompletionsArgs) -> Result<(), AppError> {
    let config = completions_config_from_args(&args)?;

    let source = DatasetSource::resolve(DatasetKind::Ldd, args.source.url.clone(), args.source.cache_dir.clone());
    let path = pipeline::locate_dataset(args.source.input.as_deref(), &source, args.source.refresh)?;
    let run = pipeline::run_completions(&path, &config)?;

    let net_table = crate::report::net_completions_table(&run.net);
    let bedroom_table = crate::report::bedroom_tenure_table(&run.bedrooms);

    println!(
        "{}",
        crate::report::format_completions_summary(&run.completions, &run.bedrooms, &config)
    );
    println!("{}", crate::report::format_table(&net_table));
    println!("{}", crate::report::format_table(&bedroom_table));

    if let Some(path) = &args.html {
        crate::report::write_html(path, HTML_TITLE, &[net_table, bedroom_table])?;
    }
    if let Some(path) = &args.export_net {
        crate::io::write_pivot_csv(path, &run.net, "borough", true, crate::io::fmt_count)?;
    }
    if let Some(path) = &args.export_bedrooms {
        crate::io::write_pivot_csv(path, &run.bedrooms.pivot, "bedrooms", true, crate::io::fmt_count)?;
    }

    Ok(())
}

pub fn ripple_config_from_args(args: &RippleArgs) -> Result<RippleConfig, AppError> {
    if args.lag_years == 0 {
        return Err(AppError::usage("`--lag-years` must be at least 1."));
    }
    if let (Some(from), Some(to)) = (args.from, args.to) {
        if from > to {
            return Err(AppError::usage("`--from` must not be after `--to`."));
        }
    }

    let regions = if args.regions.is_empty() {
        DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect()
    } else {
        args.regions.iter().map(|r| r.trim().to_string()).collect()
    };

    Ok(RippleConfig {
        regions,
        lag_years: args.lag_years,
        from: args.from,
        to: args.to,
    })
}

pub fn animation_config_from_args(args: &RippleArgs) -> Result<Option<AnimationConfig>, AppError> {
    let Some(path) = &args.gif else {
        return Ok(None);
    };
    if args.step == 0 {
        return Err(AppError::usage("`--step` must be at least 1."));
    }
    Ok(Some(AnimationConfig {
        path: path.clone(),
        width: args.gif_width,
        height: args.gif_height,
        frame_delay_ms: args.frame_delay,
        step_months: args.step,
        font: args.font.clone(),
    }))
}

pub fn completions_config_from_args(args: &CompletionsArgs) -> Result<CompletionsConfig, AppError> {
    if args.topcode == 0 {
        return Err(AppError::usage("`--topcode` must be at least 1."));
    }
    Ok(CompletionsConfig {
        topcode: args.topcode,
        year: args.year,
    })
}
