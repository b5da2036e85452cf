mod broadcast;
mod geo;
mod presence;
mod sos;
mod storage;
mod video;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::web::Config;

#[derive(Parser)]
#[command(name = "fieldlink")]
#[command(about = "Real-time drone and officer tracking with SOS alerts and video relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and print the effective settings
    Check {
        #[arg(short, long, default_value = "fieldlink.yaml")]
        config: String,
    },
    /// Run the server
    Serve {
        #[arg(short, long, default_value = "fieldlink.yaml")]
        config: String,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => check(&config),
        Commands::Serve { config } => serve(&config),
    }
}

fn load(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error loading {}: {}", path, e);
            None
        }
    }
}

fn check(path: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };

    println!("Config is valid");
    println!("  bind:             {}", config.web.bind);
    if config.web.allowed_origins.is_empty() {
        println!("  allowed origins:  any");
    } else {
        println!("  allowed origins:  {}", config.web.allowed_origins.join(", "));
    }
    println!(
        "  stale after:      {}",
        humantime::format_duration(config.presence.stale_after)
    );
    println!("  max accuracy:     {} m", config.presence.max_accuracy_m);
    println!("  SOS radius:       {} km", config.sos.radius_km);
    println!("  observer queue:   {}", config.broadcast.observer_queue);
    println!("  viewer queue:     {}", config.video.viewer_queue);
    match &config.storage.base_folder {
        Some(folder) => println!("  storage:          {}", folder.display()),
        None => println!("  storage:          in memory"),
    }

    if let Err(e) = storage::open(config.storage.base_folder.clone()) {
        eprintln!("Storage error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn serve(path: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
