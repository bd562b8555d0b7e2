use crate::config::AppConfig;
use crate::registry;
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer, ServerHandle};
use crate::spec::{load_spec_or_embedded, RouteMeta, SpecIssues};
use crate::telemetry::init_logging;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "items-api")]
#[command(about = "Contract-first items HTTP API", long_about = None, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(short, long, env = "ITEMS_CONFIG")]
        config: Option<PathBuf>,

        #[arg(short, long)]
        addr: Option<String>,

        #[arg(short, long)]
        spec: Option<PathBuf>,
    },
    /// Print the route table
    Routes {
        #[arg(short, long)]
        spec: Option<PathBuf>,
    },
    /// Validate the OpenAPI document and handler coverage
    Check {
        #[arg(short, long)]
        spec: Option<PathBuf>,
    },
}

pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { config, addr, spec } => serve(config.as_deref(), addr, spec),
        Commands::Routes { spec } => {
            let loaded = load_spec_or_embedded(spec.as_deref())?;
            print!("{}", format_route_table(&loaded.routes));
            Ok(())
        }
        Commands::Check { spec } => check(spec.as_deref()),
    }
}

fn serve(config_path: Option<&Path>, addr: Option<String>, spec: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = AppConfig::load(config_path)?;
    if let Some(addr) = addr {
        config.http.addr = addr;
    }
    if let Some(spec) = spec {
        config.spec.path = Some(spec);
    }

    let _log_guard = init_logging(&config.logging)?;
    RuntimeConfig::from_env().apply();

    let loaded = load_spec_or_embedded(config.spec.path.as_deref())?;
    let service = AppService::from_spec(&loaded, config.http.metrics)?;

    let handle = HttpServer(service)
        .start(config.http.addr.as_str())
        .with_context(|| format!("failed to start server on {}", config.http.addr))?;
    if let Err(e) = handle.wait_ready() {
        warn!(addr = %handle.addr(), error = %e, "Server did not report ready");
    }
    info!(addr = %handle.addr(), title = %loaded.title, version = %loaded.version, "Server listening");

    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}

fn check(spec: Option<&Path>) -> anyhow::Result<()> {
    let loaded = match load_spec_or_embedded(spec) {
        Ok(l) => l,
        Err(e) => {
            if let Some(SpecIssues(issues)) = e.downcast_ref::<SpecIssues>() {
                for issue in issues {
                    eprintln!("{issue}");
                }
            }
            return Err(e);
        }
    };

    let missing = registry::unregistered_handlers(&loaded.routes);
    if !missing.is_empty() {
        for name in &missing {
            eprintln!("[MissingController] {name}: no controller is registered for this operation");
        }
        anyhow::bail!("{} operation(s) have no controller", missing.len());
    }

    println!(
        "{} {}: {} route(s), all handled",
        loaded.title,
        loaded.version,
        loaded.routes.len()
    );
    Ok(())
}

/// One line per route: method, path, handler, parameters, declared statuses and summary.
pub fn format_route_table(routes: &[RouteMeta]) -> String {
    let mut sorted: Vec<&RouteMeta> = routes.iter().collect();
    sorted.sort_by(|a, b| {
        (a.path_pattern.as_ref(), a.method.as_str()).cmp(&(b.path_pattern.as_ref(), b.method.as_str()))
    });

    let mut out = String::new();
    for route in sorted {
        let mut params: Vec<String> = route
            .parameters
            .iter()
            .map(|p| {
                format!(
                    "{}:{}({})",
                    p.location,
                    p.name,
                    p.schema_type().unwrap_or("any")
                )
            })
            .collect();
        if route.request_schema.is_some() {
            params.push("body".to_string());
        }
        let statuses: Vec<String> = route.status_codes.iter().map(u16::to_string).collect();
        let mut line = format!(
            "{:<7} {:<20} {:<12} {:<24} -> {}",
            route.method.as_str(),
            format!("{}{}", route.base_path, route.path_pattern),
            route.handler_name,
            params.join(" "),
            statuses.join(",")
        );
        if let Some(summary) = &route.summary {
            line.push_str(&format!("  # {summary}"));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}
