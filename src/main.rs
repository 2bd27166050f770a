use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;

use visual_baselines::baseline::{
    AssumeYes, BaselineStore, BulkApproval, Confirm, PromptConfirm, approve_all, approve_one,
    reject_one,
};
use visual_baselines::batch::{collect_screenshots, compare_files};
use visual_baselines::config::{self, Config};
use visual_baselines::diff::{CompareOptions, ComparisonStatus, PixelGrid, run_comparison};
use visual_baselines::report;

/// Visual Baselines - screenshot regression checks with an approval workflow
#[derive(Parser, Debug)]
#[command(
    name = "visual-baselines",
    about = "Compare screenshots against stored baselines and review the differences",
    after_help = "ENVIRONMENT VARIABLES:\n\
        VISUAL_BASELINE_DIR        Baseline directory\n\
        VISUAL_DIFF_THRESHOLD      Allowed percentage of differing pixels\n\
        VISUAL_COLOR_SENSITIVITY   Per-pixel color sensitivity (0-1)\n\
        RUST_LOG                   Log filter (overrides --verbose)"
)]
struct Args {
    /// Directory holding baseline, current and diff images
    #[arg(long, short = 'd', global = true, env = "VISUAL_BASELINE_DIR")]
    baseline_dir: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List baselines grouped by review status
    List,

    /// Accept the pending screenshot for one name as its new baseline
    Approve {
        /// Screenshot name (without extension)
        name: String,
    },

    /// Discard the pending screenshot and diff for one name
    Reject {
        /// Screenshot name (without extension)
        name: String,
    },

    /// Approve every pending baseline after confirmation
    ApproveAll {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Compare one screenshot file against its baseline
    Compare {
        /// Screenshot name (without extension)
        name: String,

        /// Path to the screenshot image
        file: PathBuf,

        /// Allowed percentage of differing pixels
        #[arg(long, short = 't', value_parser = parse_non_negative)]
        threshold: Option<f64>,

        /// Per-pixel color sensitivity (0-1)
        #[arg(long, short = 'c', value_parser = parse_non_negative)]
        color_sensitivity: Option<f64>,
    },

    /// Compare every PNG in a directory (name = file stem)
    CompareDir {
        /// Directory of screenshots
        dir: PathBuf,

        /// Allowed percentage of differing pixels
        #[arg(long, short = 't', value_parser = parse_non_negative)]
        threshold: Option<f64>,

        /// Per-pixel color sensitivity (0-1)
        #[arg(long, short = 'c', value_parser = parse_non_negative)]
        color_sensitivity: Option<f64>,

        /// Maximum comparisons in flight
        #[arg(long, short = 'j', default_value = "4")]
        jobs: usize,
    },

    /// Write a solid-color PNG fixture
    Mock {
        /// Width in pixels
        #[arg(short = 'W', long, default_value = "800")]
        width: u32,

        /// Height in pixels
        #[arg(short = 'H', long, default_value = "600")]
        height: u32,

        /// Output file path
        #[arg(short, long, default_value = "./mock_screenshot.png")]
        output: PathBuf,

        /// Fill color as hex (e.g., "ff0000" for red)
        #[arg(short, long, default_value = "ffffff")]
        color: String,

        /// Caption drawn in the top-left corner
        #[arg(long)]
        text: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // The directory is fixed for the whole run
    let mut cfg = Config::from_env();
    if let Some(dir) = &args.baseline_dir {
        cfg = cfg.baseline_dir(dir);
    }
    let _ = config::init(cfg);
    let cfg = config::get();
    let store = BaselineStore::new(&cfg.baseline_dir);

    let mut failed = false;

    match args.command {
        Some(Commands::List) => {
            let listing = store.list()?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                println!("{}", report::render_listing(store.dir(), &listing));
            }
        }

        Some(Commands::Approve { name }) => {
            let outcome = approve_one(&store, &name)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", report::render_approval(&outcome));
            }
        }

        Some(Commands::Reject { name }) => {
            let outcome = reject_one(&store, &name)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", report::render_rejection(&outcome));
            }
        }

        Some(Commands::ApproveAll { yes }) => {
            let mut confirm: Box<dyn Confirm> = if yes {
                Box::new(AssumeYes)
            } else if args.json {
                // stdout carries the JSON result
                Box::new(PromptConfirm::stdin_with_stderr())
            } else {
                let listing = store.list()?;
                if listing.pending_count() > 0 {
                    println!("{}", report::render_pending(listing.pending()));
                }
                Box::new(PromptConfirm::stdin())
            };
            let result = approve_all(&store, confirm.as_mut())?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", report::render_bulk(&result));
            }
            if let BulkApproval::Completed(summary) = &result {
                failed = !summary.failures.is_empty();
            }
        }

        Some(Commands::Compare {
            name,
            file,
            threshold,
            color_sensitivity,
        }) => {
            let options = compare_options(cfg, threshold, color_sensitivity);
            let bytes = std::fs::read(&file)
                .map_err(|e| format!("Failed to read screenshot {}: {}", file.display(), e))?;
            let result = run_comparison(&name, &bytes, &options)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", report::render_comparison(&result));
            }
            failed = result.status == ComparisonStatus::Failed;
        }

        Some(Commands::CompareDir {
            dir,
            threshold,
            color_sensitivity,
            jobs,
        }) => {
            let options = compare_options(cfg, threshold, color_sensitivity);
            let files = collect_screenshots(&dir)?;
            if files.is_empty() {
                eprintln!("No PNG screenshots found in {}", dir.display());
            }

            let runtime = tokio::runtime::Runtime::new()?;
            let results = runtime.block_on(compare_files(files, options, jobs));

            let mut json_results = Vec::new();
            for (name, result) in results {
                match result {
                    Ok(result) => {
                        failed |= result.status == ComparisonStatus::Failed;
                        if args.json {
                            json_results.push(serde_json::to_value(&result)?);
                        } else {
                            print!("{}", report::render_comparison(&result));
                        }
                    }
                    Err(e) => {
                        failed = true;
                        if args.json {
                            json_results.push(serde_json::json!({ "name": name, "error": e.to_string() }));
                        } else {
                            eprintln!("Comparison failed for {}: {}", name, e);
                        }
                    }
                }
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&json_results)?);
            }
        }

        Some(Commands::Mock {
            width,
            height,
            output,
            color,
            text,
        }) => {
            let [r, g, b] = parse_hex_color(&color)?;
            let fill = [r, g, b, 255];
            let mut grid = PixelGrid::with_color(width, height, fill);
            if let Some(text) = &text {
                let fg = if u32::from(r) + u32::from(g) + u32::from(b) > 382 {
                    [0, 0, 0, 255]
                } else {
                    [255, 255, 255, 255]
                };
                grid.draw_text(10, 10, text, fg, fill);
            }

            std::fs::write(&output, grid.to_png()?)?;
            println!("Created mock screenshot: {}", output.display());
            println!("  Size: {}x{}", width, height);
        }

        None => {
            println!("Visual Baselines - screenshot regression checks");
            println!();
            println!("Usage: visual-baselines <COMMAND>");
            println!();
            println!("Commands:");
            println!("  list          List baselines grouped by review status");
            println!("  approve       Accept the pending screenshot for a name");
            println!("  reject        Discard the pending screenshot for a name");
            println!("  approve-all   Approve every pending baseline after confirmation");
            println!("  compare       Compare one screenshot against its baseline");
            println!("  compare-dir   Compare every PNG in a directory");
            println!("  mock          Write a solid-color PNG fixture");
            println!();
            println!("Run with --help for more information.");
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn compare_options(cfg: &Config, threshold: Option<f64>, color_sensitivity: Option<f64>) -> CompareOptions {
    let mut options = CompareOptions::new(&cfg.baseline_dir);
    if let Some(threshold) = threshold {
        options = options.threshold(threshold);
    }
    if let Some(sensitivity) = color_sensitivity {
        options = options.color_sensitivity(sensitivity);
    }
    options
}

/// Finite, non-negative number for `--threshold` / `--color-sensitivity`
fn parse_non_negative(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(format!("'{}' must be a finite number >= 0", value));
    }
    Ok(parsed)
}

fn parse_hex_color(hex: &str) -> Result<[u8; 3], Box<dyn Error>> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err("Color must be 6 hex digits (e.g., 'ff0000')".into());
    }
    let r = u8::from_str_radix(&hex[0..2], 16)?;
    let g = u8::from_str_radix(&hex[2..4], 16)?;
    let b = u8::from_str_radix(&hex[4..6], 16)?;
    Ok([r, g, b])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_flag_rejects_unusable_values() {
        assert_eq!(parse_non_negative("0.5"), Ok(0.5));
        assert_eq!(parse_non_negative("0"), Ok(0.0));
        assert!(parse_non_negative("NaN").is_err());
        assert!(parse_non_negative("inf").is_err());
        assert!(parse_non_negative("-1").is_err());
        assert!(parse_non_negative("lots").is_err());

        let parsed = Args::try_parse_from(["visual-baselines", "compare", "home", "a.png", "-t", "NaN"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_json_does_not_imply_yes() {
        let args = Args::try_parse_from(["visual-baselines", "--json", "approve-all"]).unwrap();
        assert!(args.json);
        assert!(matches!(args.command, Some(Commands::ApproveAll { yes: false })));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff8000").unwrap(), [255, 128, 0]);
        assert!(parse_hex_color("fff").is_err());
    }
}
