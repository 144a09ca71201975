// cli/src/main.rs
use clap::{Parser, Subcommand};
use lty_primitives::Amount;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lty-sale")]
#[command(about = "LTY token crowdsale simulator", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an example sale configuration
    Init {
        /// Output path
        #[arg(short, long, default_value = "./sale.toml")]
        output: String,
    },

    /// Replay a configured sale and print the result
    Simulate {
        /// Configuration file path
        #[arg(short, long, default_value = "./sale.toml")]
        config: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Price a contribution
    Quote {
        /// US cents per ether
        #[arg(short, long)]
        price: Amount,

        /// Contribution in wei
        #[arg(short, long)]
        wei: Amount,

        /// Bonus percent
        #[arg(short, long, default_value = "0")]
        bonus: u32,

        /// Token decimals
        #[arg(long, default_value = "2")]
        decimals: u8,

        /// Print the quote as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "lty_cli={0},lty_crowdsale={0},lty_token={0},lty_primitives={0}",
                    log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { output } => {
            init_config(&output)?;
        }
        Commands::Simulate { config, json } => {
            simulate(&config, json)?;
        }
        Commands::Quote {
            price,
            wei,
            bonus,
            decimals,
            json,
        } => {
            let quote = lty_cli::quote(price, wei, bonus, decimals)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&quote)?);
            } else {
                print!("{}", quote);
            }
        }
    }

    Ok(())
}

fn init_config(output: &str) -> anyhow::Result<()> {
    if std::path::Path::new(output).exists() {
        anyhow::bail!("{} already exists", output);
    }

    let config = lty_cli::SaleConfig::default();
    config.to_file(output)?;

    tracing::info!("Example configuration written to {}", output);
    tracing::info!("Edit it and run `lty-sale simulate --config {}`", output);
    Ok(())
}

fn simulate(config_path: &str, json: bool) -> anyhow::Result<()> {
    tracing::info!("Loading configuration from {}", config_path);
    let config = lty_cli::SaleConfig::from_file(config_path)?;

    let report = lty_cli::run(&config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
