//! platemap - compute dish overlays for a menu page
//!
//! Reads an analysis request (OCR elements, dish groups, page bounds and,
//! in remap mode, prior overlays) as JSON and writes the analysis response
//! as JSON.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};
use platemap_core::engine::{AnalysisRequest, Mode, analyze};
use platemap_core::params::EngineParams;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Overrides the request's mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Report every dish as new
    Detect,
    /// Match dishes against the request's prior overlays
    Remap,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Detect => Mode::Detect,
            ModeArg::Remap => Mode::Remap,
        }
    }
}

/// Compute non-overlapping dish overlays for a menu page.
#[derive(Parser, Debug)]
#[command(name = "platemap")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the request JSON, or "-" for stdin
    #[arg(default_value = "-")]
    input: String,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Override the request's mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    // === Engine options ===
    /// Default margin around each dish, in page units
    #[arg(long)]
    padding: Option<f64>,

    /// Maximum overlap resolution passes
    #[arg(long = "max-passes")]
    max_passes: Option<usize>,

    /// Minimum fuzzy score for a name match
    #[arg(long = "match-threshold")]
    match_threshold: Option<f64>,

    /// Disable outlier trimming of dish words
    #[arg(long = "no-trim", action = ArgAction::SetTrue)]
    no_trim: bool,

    /// Pretty-print the output JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pretty: bool,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Build EngineParams from command line arguments.
fn build_params(args: &Args) -> Result<EngineParams> {
    let mut params = EngineParams::default();
    if let Some(padding) = args.padding {
        params.default_padding = padding;
    }
    if let Some(max_passes) = args.max_passes {
        params.resolve.max_passes = max_passes;
    }
    if let Some(threshold) = args.match_threshold {
        params.matching.min_score = threshold;
    }
    params.trim.enabled = !args.no_trim;
    params.validate()?;
    Ok(params)
}

fn read_input(path: &str) -> Result<String> {
    let mut data = String::new();
    if path == "-" {
        io::stdin()
            .read_to_string(&mut data)
            .context("failed to read stdin")?;
    } else {
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut data))
            .with_context(|| format!("failed to read {path}"))?;
    }
    Ok(data)
}

fn open_output(path: &str) -> Result<Box<dyn Write>> {
    if path == "-" {
        Ok(Box::new(BufWriter::new(io::stdout())))
    } else {
        let file = File::create(path).with_context(|| format!("failed to create {path}"))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let params = build_params(&args)?;
    let data = read_input(&args.input)?;
    if data.trim().is_empty() {
        bail!("empty request");
    }
    let mut request: AnalysisRequest =
        serde_json::from_str(&data).context("request is not a valid analysis request")?;
    if let Some(mode) = args.mode {
        request.mode = mode.into();
    }
    debug!(
        elements = request.elements.len(),
        groups = request.dish_groups.len(),
        mode = ?request.mode,
        "loaded request"
    );

    let response = analyze(&request, &params)?;
    info!(
        updated = response.updated_overlays.len(),
        new = response.new_overlays.len(),
        residual = response.diagnostics.residual_overlap_count,
        "analysis complete"
    );

    let mut output = open_output(&args.outfile)?;
    if args.pretty {
        serde_json::to_writer_pretty(&mut output, &response)?;
    } else {
        serde_json::to_writer(&mut output, &response)?;
    }
    writeln!(output)?;
    output.flush()?;
    Ok(())
}
