// ============================================================================
// MintPaint CLI - headless batch painting via command-line arguments
// ============================================================================
//
// Usage examples:
//   mintpaint -i photo.png --fill 0,0,ff0000 -o filled.png
//   mintpaint -i shots/*.png --gradient 0,0,640,0 --output-dir out/
//   mintpaint -i a.png b.png --resize 1024x768 --output-dir big/ -v
//
// Every input runs through a fresh DrawingCoordinator, so the batch path
// exercises the same tool code as interactive painting.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use egui::{Pos2, pos2};
use image::Rgba;

use crate::config::EditorConfig;
use crate::coordinator::DrawingCoordinator;
use crate::io::{self, CoreError};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// MintPaint headless painter.
#[derive(Parser, Debug)]
#[command(
    name = "mintpaint",
    about = "MintPaint headless batch painter",
    long_about = "Load images, replay paint operations through the editor core and\n\
                  write the flattened result as PNG.\n\n\
                  Example:\n  \
                  mintpaint -i photo.png --fill 10,10,ff8800 -o out.png\n  \
                  mintpaint -i *.png --gradient 0,0,200,0 --output-dir out/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing; files keep their stem and get `.png`.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Editor configuration file (key = value lines).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Flood fill at X,Y with hex color RRGGBB. Repeatable.
    #[arg(long, value_name = "X,Y,RRGGBB", value_parser = parse_fill)]
    pub fill: Vec<FillOp>,

    /// Linear gradient primary -> secondary from (X0,Y0) to (X1,Y1).
    #[arg(long, value_name = "X0,Y0,X1,Y1", value_parser = parse_gradient)]
    pub gradient: Option<(Pos2, Pos2)>,

    /// Resize the canvas (anchored top-left) before painting.
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    pub resize: Option<(u32, u32)>,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillOp {
    pub at: Pos2,
    pub color: Rgba<u8>,
}

impl CliArgs {
    /// The paint operations to replay, independent of file selection.
    fn plan(&self) -> Plan {
        Plan { fills: self.fill.clone(), gradient: self.gradient, resize: self.resize }
    }
}

#[derive(Clone, Debug, Default)]
struct Plan {
    fills: Vec<FillOp>,
    gradient: Option<(Pos2, Pos2)>,
    resize: Option<(u32, u32)>,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let config = match &args.config {
        Some(path) => match EditorConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: could not read config '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => EditorConfig::default(),
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let plan = args.plan();
    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) = build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref())
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &plan, &config) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("CLI: {} failed: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(input: &Path, output: &Path, plan: &Plan, config: &EditorConfig) -> Result<(), CoreError> {
    // -- Step 1: Load ----------------------------------------------------
    let image = io::load_image(input)?;
    let (w, h) = image.dimensions();
    let mut coordinator = DrawingCoordinator::new(w, h, config.clone());
    // The editor clamps new canvases; batch mode keeps the source size.
    coordinator.resize_canvas(w, h);
    coordinator.load_image(image);

    // -- Step 2: Replay operations ---------------------------------------
    if let Some((rw, rh)) = plan.resize {
        coordinator.resize_canvas(rw, rh);
    }
    for op in &plan.fills {
        coordinator.set_primary_color(op.color);
        coordinator.fill(op.at);
    }
    if let Some((start, end)) = plan.gradient {
        coordinator.apply_gradient(start, end);
    }

    // -- Step 3: Save ----------------------------------------------------
    coordinator.save_composite(output)
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);
        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => eprintln!("warning: invalid glob '{}': {}", pattern, e),
        }
    }

    result
}

/// Output path priority: `--output`, then `--output-dir/<stem>.png`, then
/// `<stem>_out.png` next to the input.
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }
    let stem = input.file_stem()?.to_string_lossy().into_owned();
    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.png", stem)));
    }
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    Some(parent.join(format!("{}_out.png", stem)))
}

fn parse_coord(s: &str) -> Result<f32, String> {
    s.trim().parse::<f32>().map_err(|_| format!("'{}' is not a number", s))
}

fn parse_hex_color(s: &str) -> Result<Rgba<u8>, String> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(format!("'{}' is not an RRGGBB color", s));
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("'{}' is not an RRGGBB color", s));
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

/// `X,Y,RRGGBB`
fn parse_fill(s: &str) -> Result<FillOp, String> {
    let parts: Vec<&str> = s.split(',').collect();
    let [x, y, color] = parts.as_slice() else {
        return Err(format!("expected X,Y,RRGGBB, got '{}'", s));
    };
    Ok(FillOp { at: pos2(parse_coord(x)?, parse_coord(y)?), color: parse_hex_color(color)? })
}

/// `X0,Y0,X1,Y1`
fn parse_gradient(s: &str) -> Result<(Pos2, Pos2), String> {
    let coords = s.split(',').map(parse_coord).collect::<Result<Vec<_>, _>>()?;
    let [x0, y0, x1, y1] = coords.as_slice() else {
        return Err(format!("expected X0,Y0,X1,Y1, got '{}'", s));
    };
    Ok((pos2(*x0, *y0), pos2(*x1, *y1)))
}

/// `WxH`
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("bad width in '{}'", s))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("bad height in '{}'", s))?;
    if w == 0 || h == 0 {
        return Err(format!("canvas size must be non-zero, got '{}'", s));
    }
    Ok((w, h))
}
