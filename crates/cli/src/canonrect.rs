//! canonrect - convert loosely shaped rectangles to thousand-space
//!
//! Accepts one rectangle object or an array of them, in any of the shapes
//! the engine understands (x/y/w/h, edges, centers, point lists, corners,
//! nested bounds), and prints each converted to the 0-1000 grid.

use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use platemap_core::geometry::{
    CoordSpace, PageBounds, Rect, convert_to_canonical, extract_entry_rectangle,
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Convert rectangles to thousand-space.
#[derive(Parser, Debug)]
#[command(name = "canonrect")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the rectangle JSON, or "-" for stdin
    #[arg(default_value = "-")]
    input: String,

    /// Unit of the input coordinates (ratio, percent, pixels, thousand);
    /// inferred from magnitude when omitted
    #[arg(short = 'u', long)]
    unit: Option<String>,

    /// Image width, required for pixel coordinates
    #[arg(long)]
    width: Option<f64>,

    /// Image height, required for pixel coordinates
    #[arg(long)]
    height: Option<f64>,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Converted {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    coord_space: CoordSpace,
    source_space: CoordSpace,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn convert(entry: &Value, unit: Option<CoordSpace>, image: Option<&PageBounds>) -> Option<Converted> {
    let rect: Rect = extract_entry_rectangle(entry)?;
    let canonical = convert_to_canonical(&rect, unit, image)?;
    Some(Converted {
        x: canonical.rect.x,
        y: canonical.rect.y,
        w: canonical.rect.w,
        h: canonical.rect.h,
        coord_space: CoordSpace::Thousand,
        source_space: canonical.space,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let unit = args
        .unit
        .as_deref()
        .map(|label| CoordSpace::from_label(label).ok_or_else(|| anyhow!("unknown unit: {label}")))
        .transpose()?;
    let image = match (args.width, args.height) {
        (Some(width), Some(height)) => {
            let page = PageBounds::new(width, height);
            if !page.is_valid() {
                return Err(anyhow!("image size must be positive, got {width}x{height}"));
            }
            Some(page)
        }
        (None, None) => None,
        _ => return Err(anyhow!("--width and --height must be given together")),
    };

    let data = if args.input == "-" {
        let mut data = String::new();
        io::stdin()
            .read_to_string(&mut data)
            .context("failed to read stdin")?;
        data
    } else {
        fs::read_to_string(&args.input).with_context(|| format!("failed to read {}", args.input))?
    };
    let value: Value = serde_json::from_str(&data).context("input is not valid JSON")?;

    let output = match &value {
        Value::Array(entries) => {
            let converted: Vec<Option<Converted>> = entries
                .iter()
                .enumerate()
                .map(|(i, entry)| {
                    let out = convert(entry, unit, image.as_ref());
                    if out.is_none() {
                        warn!(index = i, "no usable rectangle");
                    }
                    out
                })
                .collect();
            serde_json::to_string_pretty(&converted)?
        }
        entry => {
            let converted = convert(entry, unit, image.as_ref())
                .ok_or_else(|| anyhow!("no usable rectangle in input"))?;
            serde_json::to_string_pretty(&converted)?
        }
    };
    println!("{output}");
    Ok(())
}
