use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use wardrobe_api::config::loader::{load_from_env, load_from_file, ConfigError};
use wardrobe_api::config::schema::SCHEMA;
use wardrobe_api::config::AppConfig;
use wardrobe_api::lifecycle::startup::write_config_report;

#[derive(Parser)]
#[command(name = "wardrobe-cli")]
#[command(about = "Operator CLI for the wardrobe backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration and report every problem
    Check {
        /// Read this env file instead of the process environment
        #[arg(short, long)]
        env_file: Option<PathBuf>,
    },
    /// Print the effective configuration with secrets redacted
    Show {
        #[arg(short, long)]
        env_file: Option<PathBuf>,
    },
    /// List recognised configuration keys
    Keys,
    /// Probe a running server's health endpoint
    Health {
        #[arg(short, long, default_value = "http://localhost:3000")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { env_file } => match load(env_file) {
            Ok(config) => {
                println!(
                    "OK: {} environment, port {}, {} database",
                    config.node_env,
                    config.port,
                    config.database_kind().as_str()
                );
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                write_config_report(&e, &mut std::io::stdout().lock())?;
                Ok(ExitCode::FAILURE)
            }
        },
        Commands::Show { env_file } => match load(env_file) {
            Ok(config) => {
                println!("{}", serde_json::to_string_pretty(&config.redacted())?);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                write_config_report(&e, &mut std::io::stderr().lock())?;
                Ok(ExitCode::FAILURE)
            }
        },
        Commands::Keys => {
            for field in SCHEMA {
                let presence = match (field.is_required(), field.default_value()) {
                    (true, _) => "required".to_string(),
                    (false, Some(default)) => format!("default: {}", default),
                    (false, None) => "optional".to_string(),
                };
                println!("{:<16} {:<20} {}", field.key, presence, field.help);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Health { url } => {
            let res = reqwest::get(format!("{}/health", url.trim_end_matches('/'))).await?;
            print_response(res).await
        }
    }
}

fn load(env_file: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    match env_file {
        Some(path) => load_from_file(&path),
        None => load_from_env(),
    }
}

async fn print_response(res: reqwest::Response) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(ExitCode::FAILURE);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(ExitCode::SUCCESS)
}
