use clap::{Parser, Subcommand};
use log_rotator::config::Config;
use log_rotator::rotation::{
    log_rotate, LogReporter, RotateOptions, RotationPolicy, SchedulerRegistry,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "log_rotator", about = "Rotate, compress and prune growing log files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Keep rotating the configured log files until interrupted.
    Watch {
        /// TOML file with one [[target]] table per log file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Log files to manage with size-based defaults.
        #[arg(long = "file")]
        files: Vec<PathBuf>,
    },
    /// Run a single rotation pass over a directory.
    Once {
        dir: PathBuf,
        #[arg(long, default_value_t = 10, allow_hyphen_values = true)]
        max_size_mb: i64,
        #[arg(long, default_value_t = 7, allow_hyphen_values = true)]
        max_backup_count: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Once {
            dir,
            max_size_mb,
            max_backup_count,
        } => {
            log::info!("Rotating log files under {:?}", dir);
            tokio::task::spawn_blocking(move || {
                log_rotate(dir, max_size_mb, max_backup_count, Arc::new(LogReporter))
            })
            .await?;
        }
        Command::Watch { config, files } => {
            let mut policies = match config {
                Some(path) => Config::load(&path)
                    .and_then(|c| c.policies())
                    .map_err(|e| format!("Failed to load config {:?}: {}", path, e))?,
                None => Vec::new(),
            };
            for file in files {
                let options = RotateOptions {
                    logger_file: file,
                    ..Default::default()
                };
                policies.push(RotationPolicy::from_options(&options)?);
            }
            if policies.is_empty() {
                return Err("nothing to watch: pass --config or --file".into());
            }

            let registry = SchedulerRegistry::new(Arc::new(LogReporter));
            for policy in policies {
                log::info!(
                    "Watching {:?} every {:?}",
                    policy.target.file_path,
                    policy.check_cycle
                );
                registry.rotate(policy);
            }

            tokio::signal::ctrl_c().await?;
            log::info!("Shutting down {} rotation task(s)", registry.len());
            registry.shutdown().await;
        }
    }

    Ok(())
}
