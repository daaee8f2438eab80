use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr};
use cone_geometry::BaseSelectionPolicy;
use pile_cli::{OverlayLabel, PileConfig, draw_overlay};
use pile_detect::{DetectionOrchestrator, Measurement, PileCommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pile configuration file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the pile triangle in an image and print its vertices
    Detect {
        /// Camera frame to analyse
        #[arg(short, long)]
        image: PathBuf,
        /// Pile identifier, e.g. ZIF1
        #[arg(short, long)]
        pile: String,
        /// Binarization threshold, overrides the configured one
        #[arg(short, long)]
        threshold: Option<u8>,
    },
    /// Compute cone metrics for manually placed vertices
    Measure {
        /// Pile identifier, e.g. ZIF1
        #[arg(short, long)]
        pile: String,
        /// Vertex as `x,y` in original image pixels; repeat up to three times
        #[arg(long = "point", value_parser = parse_point, num_args = 1)]
        points: Vec<(f64, f64)>,
        /// Base selection rule, overrides the configured one
        #[arg(long, value_parser = parse_policy)]
        policy: Option<BaseSelectionPolicy>,
    },
    /// Detect, measure and optionally write an overlay image and GeoJSON
    Run {
        /// Camera frame to analyse
        #[arg(short, long)]
        image: PathBuf,
        /// Pile identifier, e.g. ZIF1
        #[arg(short, long)]
        pile: String,
        /// Binarization threshold, overrides the configured one
        #[arg(short, long)]
        threshold: Option<u8>,
        /// Where to save the image with the triangle drawn on it
        #[arg(long)]
        overlay: Option<PathBuf>,
        /// Where to save the measurement as GeoJSON
        #[arg(long)]
        geojson: Option<PathBuf>,
    },
    /// Apply a JSON list of session commands and print the final measurement
    Replay {
        /// Pile identifier, e.g. ZIF1
        #[arg(short, long)]
        pile: String,
        /// JSON file holding an array of commands
        #[arg(long)]
        commands: PathBuf,
        /// Image for `auto_detect` commands
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
    /// Print a JSON schema
    Schema {
        #[arg(value_enum, default_value = "config")]
        kind: SchemaKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaKind {
    /// Pile configuration file
    Config,
    /// Session commands
    Commands,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Detect { image, pile, threshold } => {
            detect(&config, image, pile, *threshold)?;
        }
        Commands::Measure { pile, points, policy } => {
            measure(&config, pile, points, *policy)?;
        }
        Commands::Run {
            image,
            pile,
            threshold,
            overlay,
            geojson,
        } => {
            run(&config, image, pile, *threshold, overlay.as_deref(), geojson.as_deref())?;
        }
        Commands::Replay { pile, commands, image } => {
            replay(&config, pile, commands, image.as_deref())?;
        }
        Commands::Schema { kind } => {
            let schema = match kind {
                SchemaKind::Config => PileConfig::schema(),
                SchemaKind::Commands => PileCommand::schema(),
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PileConfig> {
    match path {
        Some(path) => {
            let config = PileConfig::from_file(path)
                .wrap_err_with(|| format!("Failed to load configuration {}", path.display()))?;
            info!("Loaded configuration for {} piles from {:?}", config.piles.len(), path);
            Ok(config)
        }
        None => Ok(PileConfig::default()),
    }
}

fn detect(config: &PileConfig, image_path: &Path, pile: &str, threshold: Option<u8>) -> Result<()> {
    let image = image::open(image_path)
        .wrap_err_with(|| format!("Failed to open {}", image_path.display()))?;

    let triangle = DetectionOrchestrator::new().detect(
        &image,
        pile,
        threshold,
        config.camera_config(pile),
    )?;

    match triangle {
        Some(triangle) => println!("{}", serde_json::to_string_pretty(&triangle)?),
        None => warn!("No pile detected in {:?}", image_path),
    }
    Ok(())
}

fn measure(
    config: &PileConfig,
    pile: &str,
    points: &[(f64, f64)],
    policy: Option<BaseSelectionPolicy>,
) -> Result<()> {
    let mut session = config.session(pile)?;
    if let Some(policy) = policy {
        session = session.with_policy(policy);
    }

    for &(x, y) in points {
        session.execute(PileCommand::AddVertex { x, y })?;
    }
    let measurement = session.execute(PileCommand::Measure)?;
    report(&measurement);
    println!("{}", serde_json::to_string_pretty(&measurement)?);
    Ok(())
}

fn run(
    config: &PileConfig,
    image_path: &Path,
    pile: &str,
    threshold: Option<u8>,
    overlay: Option<&Path>,
    geojson: Option<&Path>,
) -> Result<()> {
    let mut session = config.session(pile)?;
    session.load_image(image_path)?;

    let measurement = session.execute(PileCommand::AutoDetect { threshold })?;
    if measurement.triangle.is_empty() {
        warn!("No pile detected in {:?}", image_path);
        return Ok(());
    }
    report(&measurement);

    if let (Some(path), Some(image)) = (overlay, session.image()) {
        let label = OverlayLabel::for_profile(session.profile());
        draw_overlay(image, &measurement, &label)?
            .save(path)
            .wrap_err_with(|| format!("Failed to save overlay {}", path.display()))?;
        info!("Overlay saved to {:?}", path);
    }

    if let Some(path) = geojson {
        measurement.save_geojson(path)?;
        info!("GeoJSON saved to {:?}", path);
    }
    Ok(())
}

fn replay(config: &PileConfig, pile: &str, commands_path: &Path, image: Option<&Path>) -> Result<()> {
    let content = std::fs::read_to_string(commands_path)?;
    let commands: Vec<PileCommand> = serde_json::from_str(&content)
        .wrap_err_with(|| format!("Invalid command list {}", commands_path.display()))?;

    let mut session = config.session(pile)?;
    if let Some(image) = image {
        session.load_image(image)?;
    }

    let mut measurement = session.measurement()?;
    for command in commands {
        info!("{}: {}", command, command.description());
        measurement = session.execute(command)?;
    }

    report(&measurement);
    println!("{}", serde_json::to_string_pretty(&measurement)?);
    Ok(())
}

fn report(measurement: &Measurement) {
    for side in &measurement.sides {
        info!(
            "{}: {:.1} px, {:.2} m{}",
            side.label,
            side.length_px,
            side.length_m,
            if side.is_base { " (base)" } else { "" }
        );
    }
    let metrics = &measurement.metrics;
    info!(
        "Volume: {:.2} m³, mass: {:.2} t (radius {:.2} m, height {:.2} m)",
        metrics.volume, metrics.mass, metrics.radius, metrics.height
    );
}

fn parse_point(s: &str) -> std::result::Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{s}`"))?;
    let parse = |v: &str| v.trim().parse::<f64>().map_err(|e| format!("invalid coordinate `{v}`: {e}"));
    Ok((parse(x)?, parse(y)?))
}

fn parse_policy(s: &str) -> std::result::Result<BaseSelectionPolicy, String> {
    s.parse().map_err(|_| {
        format!(
            "unknown base policy `{s}`, expected one of {:?}",
            <BaseSelectionPolicy as strum::VariantNames>::VARIANTS
        )
    })
}
