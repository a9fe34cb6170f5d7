use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use overlay_translator_rust::{Config, FitMode};

#[derive(Parser, Debug)]
#[command(
    name = "overlay-translator-rust",
    version,
    about = "Lay out translated OCR fragments over a captured screen region"
)]
struct Cli {
    /// Recognition result as JSON (reads stdin when omitted)
    #[arg(long = "fragments")]
    fragments: Option<PathBuf>,

    /// Horizontal DPI of the captured image
    #[arg(long = "dpi-x", default_value_t = 96.0)]
    dpi_x: f64,

    /// Vertical DPI of the captured image
    #[arg(long = "dpi-y", default_value_t = 96.0)]
    dpi_y: f64,

    /// Font fitting strategy (live, precise)
    #[arg(long = "fit")]
    fit: Option<String>,

    /// Source language used when detection fails
    #[arg(short = 'L', long = "source-lang")]
    source_lang: Option<String>,

    /// Target language
    #[arg(short = 'l', long = "target-lang")]
    target_lang: Option<String>,

    /// Maximum fragments translated at once (0 = all cores)
    #[arg(long = "concurrency")]
    concurrency: Option<usize>,

    /// Write an SVG of the translated capture to this path
    #[arg(long = "render-svg", requires = "image")]
    render_svg: Option<PathBuf>,

    /// Captured image used as the SVG background
    #[arg(long = "image")]
    image: Option<PathBuf>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    overlay_translator_rust::logging::init(cli.verbose)?;

    let fit = cli
        .fit
        .as_deref()
        .map(|value| {
            FitMode::parse(value).ok_or_else(|| anyhow!("unknown fit mode '{}'", value))
        })
        .transpose()?;

    let input = match cli.fragments.as_deref() {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fragments: {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .with_context(|| "failed to read stdin")?;
            buffer
        }
    };

    let config = Config {
        dpi_x: cli.dpi_x,
        dpi_y: cli.dpi_y,
        fit,
        source_lang: cli.source_lang,
        target_lang: cli.target_lang,
        concurrency: cli.concurrency,
        render_svg: cli.render_svg,
        image: cli.image,
        settings_path: cli.read_settings,
    };

    let output = overlay_translator_rust::run(config, &input).await?;
    println!("{}", output);
    Ok(())
}
