use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use comping::config::{self, Config};

#[derive(Parser)]
#[command(name = "comping", about = "Generate a flashcard deck of jazz chord voicings")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chord table (`;`-delimited, header row); default: every root with every quality
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output .apkg file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Chord roots, comma separated (e.g. C,F#,Bb)
    #[arg(long, value_delimiter = ',')]
    roots: Option<Vec<String>>,

    /// Chord qualities, comma separated (maj7, min7, halfdim, dom7)
    #[arg(long, value_delimiter = ',')]
    qualities: Option<Vec<String>>,

    /// Voicings, comma separated (e.g. shell-off-3rd,Rootless_V_Off_7th)
    #[arg(long, value_delimiter = ',')]
    voicings: Option<Vec<String>>,

    /// Render score images and audio with lilypond, fluidsynth and ffmpeg
    #[arg(long)]
    media: bool,

    /// Log every record as it is built
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Configuration file values, overridden by command-line flags
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(input) = &self.input {
            config.input = Some(input.clone());
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(roots) = &self.roots {
            config.roots = config::parse_roots(roots).context("Invalid --roots")?;
        }
        if let Some(qualities) = &self.qualities {
            config.qualities = config::parse_qualities(qualities).context("Invalid --qualities")?;
        }
        if let Some(voicings) = &self.voicings {
            config.voicings = config::parse_voicings(voicings).context("Invalid --voicings")?;
        }
        if self.media {
            config.media.enabled = true;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    let config = cli.resolve_config()?;
    if let Some(input) = &config.input {
        if !input.is_file() {
            anyhow::bail!("Chord table not found: {}", input.display());
        }
    }

    let report = comping::generate_deck(&config)
        .with_context(|| format!("Failed to generate deck {}", config.output.display()))?;

    println!(
        "{} cards generated and saved into deck {}",
        report.notes,
        report.output.display()
    );
    Ok(())
}
