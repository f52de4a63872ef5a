mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cli::Cli;
use sonoterra::config::{self, Config};
use sonoterra::{Outcome, Session, SymphoniaDecoder};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.as_deref())?;

    // CLI flags win over the config file
    if let Some(v) = cli.width_segments { cfg.terrain.width_segments = v; }
    if let Some(v) = cli.height_segments { cfg.terrain.height_segments = v; }
    if let Some(v) = cli.radius_top { cfg.terrain.radius_top = v; }
    if let Some(v) = cli.radius_bottom { cfg.terrain.radius_bottom = v; }
    if let Some(v) = cli.height { cfg.terrain.height = v; }
    if let Some(v) = cli.height_scale { cfg.terrain.height_scale = v; }
    if cli.no_caps { cfg.terrain.caps = false; }
    if let Some(dir) = cli.output_dir { cfg.output.directory = dir; }

    let terrain = &cfg.terrain;
    log::info!("sonoterra - audio relief mesh generator");
    log::info!(
        "Cylinder: r_top={} r_bottom={} height={} segments={}x{} caps={}",
        terrain.radius_top,
        terrain.radius_bottom,
        terrain.height,
        terrain.width_segments,
        terrain.height_segments,
        terrain.caps
    );
    log::info!("Height scale: {}", terrain.height_scale);
    log::info!("Output directory: {}", cfg.output.directory.display());

    let out_dir = cfg.output.directory;
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let mut session = Session::new(cfg.terrain, cfg.viewer, Arc::new(SymphoniaDecoder))
        .context("Invalid terrain configuration")?;

    let pb = ProgressBar::new(cli.inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    let mut failed = 0usize;
    for input in &cli.inputs {
        pb.set_message(input.display().to_string());
        match process(&mut session, input, &out_dir) {
            Ok(path) => log::info!("Wrote {}", path.display()),
            Err(err) => {
                log::error!("{}: {:#}", input.display(), err);
                failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    if failed > 0 {
        anyhow::bail!("{} of {} inputs failed", failed, cli.inputs.len());
    }
    Ok(())
}

/// Explicit `--config`, else `./sonoterra.toml`, else the platform config dir.
fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        let cfg = config::load_config(path)?;
        log::info!("Loaded config from {}", path.display());
        return Ok(cfg);
    }

    let candidates = std::iter::once(PathBuf::from("sonoterra.toml"))
        .chain(dirs::config_dir().map(|d| d.join("sonoterra").join("config.toml")));

    for path in candidates.filter(|p| p.exists()) {
        match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                return Ok(cfg);
            }
            Err(err) => log::warn!("Ignoring config: {}", err),
        }
    }
    Ok(Config::default())
}

fn process(session: &mut Session, input: &Path, out_dir: &Path) -> Result<PathBuf> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());

    match session.load(name, bytes)? {
        Outcome::Applied { .. } => {}
        other => anyhow::bail!("Decode did not produce a terrain ({:?})", other),
    }

    let file_name = session
        .export_file_name()
        .context("No terrain to export")?;
    let path = out_dir.join(file_name);
    let stl = session.export()?;
    std::fs::write(&path, &stl)
        .with_context(|| format!("Failed to write STL: {}", path.display()))?;
    Ok(path)
}
