use std::time::Duration;

use clap::Parser;
use stashio_engine::{CacheConfig, CacheWorker, HttpRequest, WorkerConfig};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use url::Url;

mod cli;
mod error;

use cli::{CliArgs, Command};
use error::AppError;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    // Parse command-line arguments
    let args = CliArgs::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    let config = build_worker_config(&args)?;
    let worker = CacheWorker::new(config).await?;

    match args.command {
        Command::Precache { urls } => {
            worker.on_install().await?;
            worker.on_activate().await?;
            info!(assets = urls.len(), "Precache complete");
        }
        Command::Fetch { urls, output_dir } => {
            // The worker runs its install/activate cycle before serving so
            // partitions from older versions are purged up front
            worker.on_install().await?;
            worker.on_activate().await?;

            if let Some(dir) = &output_dir {
                tokio::fs::create_dir_all(dir).await?;
            }

            for url in urls {
                let request = HttpRequest::get(&url)?;
                let response = worker.on_fetch(&request).await?;

                info!(
                    url = %url,
                    status = %response.status,
                    bytes = response.body.len(),
                    "Served"
                );

                if let Some(dir) = &output_dir {
                    let path = dir.join(output_filename(request.url()));
                    tokio::fs::write(&path, &response.body).await?;
                    info!(path = %path.display(), "Wrote body");
                }
            }
        }
        Command::Activate => {
            worker.on_install().await?;
            worker.on_activate().await?;
            info!("Stale partitions purged");
        }
    }

    Ok(())
}

fn build_worker_config(args: &CliArgs) -> Result<WorkerConfig, AppError> {
    let cache_config = CacheConfig {
        disk_cache_path: args.cache_dir.clone(),
        ..Default::default()
    };

    let mut builder = WorkerConfig::builder()
        .with_version(&args.worker_version)
        .with_api_marker(&args.api_marker)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_cache_config(cache_config);

    if let Some(origin) = &args.origin {
        let origin = Url::parse(origin)
            .map_err(|e| AppError::InvalidInput(format!("invalid origin {origin}: {e}")))?;
        builder = builder.with_origin(origin);
    }

    if let Command::Precache { urls } = &args.command {
        builder = builder.with_precache_manifest(urls.clone());
    }

    Ok(builder.build())
}

/// Derive an output filename from the URL path, falling back to the host.
fn output_filename(url: &Url) -> String {
    let name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("index.html");

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();

    if sanitized.is_empty() {
        warn!(url = %url, "Could not derive a filename, using fallback");
        "response.bin".to_owned()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_filename() {
        let url = Url::parse("https://example.com/assets/app.css").unwrap();
        assert_eq!(output_filename(&url), "app.css");

        let root = Url::parse("https://example.com/").unwrap();
        assert_eq!(output_filename(&root), "index.html");

        let odd = Url::parse("https://example.com/a:b").unwrap();
        assert_eq!(output_filename(&odd), "a_b");
    }
}
