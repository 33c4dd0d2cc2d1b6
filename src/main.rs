//! attrbag inspector
//!
//! Encodes JSON bags to wire records, decodes them back and shows what a
//! record or dictionary contains.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use attrbag::codec::Codec;
use attrbag::{decode, decode_batch_merged, AttributeBag, CompressedRecord, Config, Encoder};

#[derive(Parser, Debug)]
#[command(name = "attrbag", version, about = "Encode, decode and inspect attribute bags")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a JSON bag into a compressed record
    Encode {
        #[arg(long)]
        config: PathBuf,
        /// Bag as JSON: {"name": {"kind": "string", "value": "..."}}
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Decode a compressed record (or batch) and print the bag as JSON
    Decode {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        input: PathBuf,
        /// Treat the input as a batch and print the merged bag
        #[arg(long)]
        batch: bool,
    },
    /// Print the raw record: local words and index tables
    Inspect {
        #[arg(long)]
        input: PathBuf,
    },
    /// Print the configured dictionary's version, size and fingerprint
    Dictionary {
        #[arg(long)]
        config: PathBuf,
    },
}

impl Command {
    fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Command::Encode { config, .. }
            | Command::Decode { config, .. }
            | Command::Dictionary { config } => Some(config),
            Command::Inspect { .. } => None,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command.config_path() {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::default(),
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .init();

    match cli.command {
        Command::Encode { input, output, .. } => {
            let dictionary = config.load_dictionary()?;
            let json = std::fs::read_to_string(&input)
                .with_context(|| format!("reading bag {}", input.display()))?;
            let bag: AttributeBag = serde_json::from_str(&json).context("parsing bag JSON")?;

            let bytes = Encoder::new(&dictionary)
                .with_options(config.codec)
                .encode(&bag)?;
            std::fs::write(&output, &bytes)
                .with_context(|| format!("writing {}", output.display()))?;

            tracing::info!(
                "Encoded {} attributes into {} bytes (dictionary v{})",
                bag.len(),
                bytes.len(),
                dictionary.version()
            );
        }
        Command::Decode { input, batch, .. } => {
            let dictionary = config.load_dictionary()?;
            let bytes = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;

            let bag = if batch {
                decode_batch_merged(&bytes, &dictionary)?
            } else {
                decode(&bytes, &dictionary)?
            };
            println!("{}", serde_json::to_string_pretty(&bag)?);
        }
        Command::Inspect { input } => {
            let bytes = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let record = CompressedRecord::from_bytes(&bytes)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Dictionary { .. } => {
            let dictionary = config.load_dictionary()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "path": config.dictionary_path,
                    "version": dictionary.version(),
                    "words": dictionary.len(),
                    "fingerprint": dictionary.fingerprint().to_hex(),
                }))?
            );
        }
    }

    Ok(())
}
