//! CLI entry point for the transit proxy.
//!
//! Runs the HTTP server, or answers a single query against the live
//! upstreams and prints it as JSON.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_proxy::config::{
    DEFAULT_BIND, DEFAULT_LEGACY_BASE_URL, DEFAULT_RELAY_BASE_URL, Settings,
};
use transit_proxy::facade::QueryFacade;
use transit_proxy::server;

#[derive(Parser)]
#[command(name = "transit_proxy")]
#[command(about = "Normalizing proxy in front of the Istanbul bus data services", long_about = None)]
struct Cli {
    #[command(flatten)]
    upstream: UpstreamArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct UpstreamArgs {
    /// Base URL of the envelope-based legacy service
    #[arg(long, global = true, env = "LEGACY_BASE_URL", default_value = DEFAULT_LEGACY_BASE_URL)]
    legacy_base_url: String,

    /// Base URL of the JSON relay service
    #[arg(long, global = true, env = "RELAY_BASE_URL", default_value = DEFAULT_RELAY_BASE_URL)]
    relay_base_url: String,

    /// Default upstream request timeout in seconds
    #[arg(long, global = true, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Lifetime of the line and stop directories in seconds
    #[arg(long, global = true, env = "REFERENCE_TTL_SECS", default_value_t = 86_400)]
    reference_ttl_secs: u64,

    /// Lifetime of cached timetables in seconds
    #[arg(long, global = true, env = "TIMETABLE_TTL_SECS", default_value_t = 43_200)]
    timetable_ttl_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, env = "TRANSIT_PROXY_BIND", default_value = DEFAULT_BIND)]
        bind: SocketAddr,

        /// Load the stop directory in the background at startup
        #[arg(long, default_value_t = false)]
        warm: bool,
    },
    /// Print the line directory
    Lines,
    /// Print a stop and the vehicles approaching it
    Stop {
        #[arg(value_name = "STOP_CODE")]
        code: String,
    },
    /// Print the ordered stops of a line
    Route {
        #[arg(value_name = "LINE_CODE")]
        line: String,
    },
}

impl UpstreamArgs {
    fn settings(&self) -> Settings {
        Settings {
            legacy_base_url: self.legacy_base_url.clone(),
            relay_base_url: self.relay_base_url.clone(),
            upstream_timeout: Duration::from_secs(self.timeout_secs),
            reference_ttl: Duration::from_secs(self.reference_ttl_secs),
            timetable_ttl: Duration::from_secs(self.timetable_ttl_secs),
            ..Settings::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_proxy.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_proxy.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut settings = cli.upstream.settings();

    match cli.command {
        Commands::Serve { bind, warm } => {
            settings.bind = bind;
            let facade = Arc::new(QueryFacade::connect(&settings)?);
            info!(
                legacy = %settings.legacy_base_url,
                relay = %settings.relay_base_url,
                "Upstreams configured"
            );

            if warm {
                let facade = facade.clone();
                tokio::spawn(async move { facade.warm().await });
            }
            server::serve(settings.bind, facade).await?;
        }
        Commands::Lines => {
            let facade = QueryFacade::connect(&settings)?;
            let lines = facade.all_lines().await?;
            info!(total = lines.len(), "Line directory fetched");
            println!("{}", serde_json::to_string_pretty(lines.as_ref())?);
        }
        Commands::Stop { code } => {
            let facade = QueryFacade::connect(&settings)?;
            let arrivals = facade.stop_arrivals(&code).await?;
            println!("{}", serde_json::to_string_pretty(&arrivals)?);
        }
        Commands::Route { line } => {
            let facade = QueryFacade::connect(&settings)?;
            let route = facade.route(&line).await?;
            info!(
                outbound_stops = route.outbound_stops.len(),
                return_stops = route.return_stops.len(),
                "Route resolved"
            );
            println!("{}", serde_json::to_string_pretty(&route)?);
        }
    }

    Ok(())
}
