use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use wav_vault::app::AppContext;
use wav_vault::config::load_config;
use wav_vault::db::DynError;
use wav_vault::serve::serve;

#[derive(Parser, Debug)]
#[command(author, version, about = "Upload wav files, store them as mp3, download them by url")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,

        /// Port to listen on (overrides config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Register a user and print its id and token
    Register {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,

        /// Display name of the new user
        username: String,
    },
}

fn main() -> Result<(), DynError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Command::Serve { config, port } => {
            let mut config = load_config(&config)?;
            if let Some(port) = port {
                config.port = port;
            }
            serve(config)
        }
        Command::Register { config, username } => register(config, username),
    }
}

fn register(config_path: PathBuf, username: String) -> Result<(), DynError> {
    let config = load_config(&config_path)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let ctx = AppContext::start(&config).await?;
        let result = ctx.identities.register(&username).await;
        ctx.stop().await;

        let registration = result?;
        info!("Registered '{}'", username);
        println!("user_id: {}", registration.user_id);
        println!("token: {}", registration.token);
        Ok::<(), DynError>(())
    })
}
