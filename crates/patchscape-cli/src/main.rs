//! Landscape metrics for categorical grids read from JSON.
//! Writes one JSON report per layer (an array when several layers are given).

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use flexi_logger::Logger;
use log::{debug, info};
use patchscape_core::neutral::{fbm_landscape, random_landscape};
use patchscape_core::{analyze_layers, build_grid, AnalysisConfig, Connectivity, Grid, LandscapeReport};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "patchscape", about = "Patch, core-area and landscape metrics for categorical grids")]
struct Args {
    /// Grid JSON file(s): {"x_res", "y_res", "rows": [[class or null, ...], ...]}.
    /// Several files are analysed as independent layers.
    #[arg(short, long, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Generate a neutral landscape instead of reading one.
    #[arg(long, value_enum, conflicts_with = "input")]
    synthetic: Option<Synthetic>,

    #[arg(long, default_value_t = 100)]
    width: usize,

    #[arg(long, default_value_t = 100)]
    height: usize,

    /// Number of classes of a synthetic landscape.
    #[arg(long, default_value_t = 4)]
    classes: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Analysis configuration JSON; flags below override its fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Patch connectivity, 4 or 8.
    #[arg(long)]
    connectivity: Option<u8>,

    /// Core edge depth in cells.
    #[arg(long)]
    edge_depth: Option<u32>,

    /// Keep cells whose only violator is the landscape boundary as core.
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    consider_boundary: Option<bool>,

    /// Count landscape-boundary sides as perimeter and edge.
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    count_boundary: Option<bool>,

    /// Output JSON file (stdout if omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level or flexi_logger filter, e.g. `debug` or `patchscape_core=trace`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Synthetic {
    Random,
    Fbm,
}

// ── Input ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GridFile {
    x_res: f64,
    y_res: f64,
    rows: Vec<Vec<Option<i64>>>,
    /// Optional georeference of the top-left corner.
    origin: Option<(f64, f64)>,
}

fn read_grid(path: &Path) -> Result<Grid> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: GridFile =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let grid = build_grid(&file.rows, file.x_res, file.y_res)
        .with_context(|| format!("building grid from {}", path.display()))?;
    Ok(match file.origin {
        Some((x_min, y_max)) => grid.with_origin(x_min, y_max),
        None => grid,
    })
}

fn load_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            AnalysisConfig::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => AnalysisConfig::default(),
    };

    if let Some(c) = args.connectivity {
        config.connectivity = Connectivity::try_from(c)?;
    }
    if let Some(depth) = args.edge_depth {
        config.core.edge_depth = depth;
    }
    if let Some(consider) = args.consider_boundary {
        config.core.consider_boundary = consider;
    }
    if let Some(count) = args.count_boundary {
        config.count_boundary = count;
    }
    config.validate()?;
    Ok(config)
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    let _logger = Logger::try_with_str(&args.log_level)
        .with_context(|| format!("invalid log level {:?}", args.log_level))?
        .start()?;

    let config = load_config(&args)?;
    debug!("configuration: {config:?}");

    let grids = match args.synthetic {
        Some(Synthetic::Random) => vec![random_landscape(args.width, args.height, args.classes, args.seed)?],
        Some(Synthetic::Fbm) => vec![fbm_landscape(args.width, args.height, args.classes, args.seed)?],
        None if args.input.is_empty() => bail!("no input: pass --input or --synthetic (see --help)"),
        None => args.input.iter().map(|p| read_grid(p)).collect::<Result<Vec<_>>>()?,
    };
    info!("analysing {} layer(s)", grids.len());

    let reports = analyze_layers(&grids, &config)?;
    let json = match reports.as_slice() {
        [single] => serde_json::to_string_pretty(single)?,
        many => serde_json::to_string_pretty(many)?,
    };

    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("  -> {}", path.display());
        }
        None => println!("{json}"),
    }

    for (i, report) in reports.iter().enumerate() {
        print_summary(i, report);
    }
    Ok(())
}

fn print_summary(layer: usize, report: &LandscapeReport) {
    let l = &report.landscape;
    eprintln!(
        "layer {layer}: {}x{} cells, {} patches, {} classes, {:.4} ha, SHDI {:.3}, {} disjunct cores",
        report.width,
        report.height,
        l.np,
        l.pr,
        l.ta_ha,
        l.shdi,
        report.disjunct_cores.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(argv: &[&str]) -> Result<AnalysisConfig> {
        let mut full = vec!["patchscape", "--synthetic", "random"];
        full.extend_from_slice(argv);
        load_config(&Args::try_parse_from(full)?)
    }

    #[test]
    fn flags_default_to_config_values() {
        assert_eq!(config_from(&[]).unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn boundary_flags_override_config_file_both_ways() {
        let path = std::env::temp_dir().join(format!("patchscape-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"count_boundary": true, "core": {"consider_boundary": true}}"#).unwrap();
        let path_arg = path.to_string_lossy().into_owned();
        let path_arg = path_arg.as_str();

        let from_file = config_from(&["--config", path_arg]).unwrap();
        assert!(from_file.count_boundary);
        assert!(from_file.core.consider_boundary);

        let overridden = config_from(&[
            "--config", path_arg,
            "--count-boundary", "false",
            "--consider-boundary", "false",
        ])
        .unwrap();
        assert!(!overridden.count_boundary);
        assert!(!overridden.core.consider_boundary);

        let switched_on = config_from(&["--count-boundary", "true"]).unwrap();
        assert!(switched_on.count_boundary);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn invalid_overrides_rejected() {
        assert!(config_from(&["--connectivity", "6"]).is_err());
        assert!(config_from(&["--edge-depth", "0"]).is_err());
    }
}
