use clap::{Parser, Subcommand};

pub mod config;
pub mod run;

#[derive(Parser)]
#[command(name = "agorapass")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "AgoraPass community vouching service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the REST API server
    Serve {
        /// Path to config file (default: <data dir>/agorapass/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Print a default configuration file to stdout
    Config,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Serve { config } => run::execute(config).await,
        Commands::Config => {
            let data_dir = config::default_config_path()
                .parent()
                .map(std::path::Path::to_path_buf)
                .unwrap_or_default();
            print!("{}", config::AgoraConfig::generate_default_toml(&data_dir));
            Ok(())
        }
    }
}
