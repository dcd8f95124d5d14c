use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sa_domain::config::{Config, ConfigSeverity};
use sa_gateway::api;
use sa_gateway::cli::{load_config, Cli, Command, ConfigCommand};
use sa_gateway::state::AppState;

/// Verbosity is controlled by the single `LOGLEVEL` env var (spec.md §6),
/// not the conventional `RUST_LOG` — falls back to `"info"` when unset or
/// unrecognized.
fn init_tracing() {
    let level = std::env::var("LOGLEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();
}

/// Builds the CORS layer from configured origins. A bare `"*"` entry is
/// fully permissive; otherwise origins are split into exact matches and
/// `:*`-suffixed wildcard-port prefixes, the latter validated at request
/// time so a suffix like `:80evil.com` can't slip past the prefix check.
fn build_cors_layer(cors: &sa_domain::config::CorsConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS];

    if cors.allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS allowed_origins contains \"*\", allowing any origin");
        return CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let mut exact = Vec::new();
    let mut wildcard_prefixes = Vec::new();
    for origin in &cors.allowed_origins {
        if let Some(prefix) = origin.strip_suffix(":*") {
            wildcard_prefixes.push(format!("{prefix}:"));
        } else if let Ok(value) = HeaderValue::from_str(origin) {
            exact.push(value);
        } else {
            tracing::warn!(origin, "ignoring invalid CORS origin");
        }
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            let Ok(origin_str) = origin.to_str() else {
                return false;
            };
            if exact.iter().any(|e| e == origin) {
                return true;
            }
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        }))
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Error => tracing::error!("{issue}"),
            ConfigSeverity::Warning => tracing::warn!("{issue}"),
        }
    }
    if Config::has_errors(&issues) {
        anyhow::bail!("configuration has errors, refusing to start");
    }

    let state = AppState::new(config.registry.ttl_hours);
    let cors = build_cors_layer(&config.server.cors);

    let app = api::router(state)
        .layer(cors)
        .layer(ConcurrencyLimitLayer::new(1024))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "observability gateway listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::Config(ConfigCommand::Show) => {
            println!("{}", toml::to_string_pretty(&config).context("serializing config")?);
            Ok(())
        }
        Command::Config(ConfigCommand::Validate) => {
            let issues = config.validate();
            for issue in &issues {
                println!("{issue}");
            }
            if Config::has_errors(&issues) {
                anyhow::bail!("configuration invalid");
            }
            println!("configuration valid");
            Ok(())
        }
    }
}
