use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use smartbus_maps::backend::{BackendClient, RouteDataApi};
use smartbus_maps::config::AppConfig;
use smartbus_maps::controller::StatusVariant;
use smartbus_maps::controller::route_detail::{DetailView, RouteDetailController, StopKpis};
use smartbus_maps::model::api_model::{RouteSummary, StopGeo};
use smartbus_maps::model::stop::Direction;
use smartbus_maps::render::RouteRenderer;
use smartbus_maps::routing::OsrmClient;

#[derive(Parser)]
#[command(about = "Render smartbus route maps from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a route's stops for one direction and render the map to
    /// GeoJSON.
    Render {
        #[arg(long)]
        route: i64,
        #[arg(long, value_enum, default_value_t = Direction::Di)]
        dir: Direction,
        /// Write the FeatureCollection here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the KPI summary of a route.
    Summary {
        #[arg(long)]
        route: i64,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    _ = dotenv();

    let cli = Cli::parse();

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(
            dotenvy::var("OTLP_ENDPOINT").unwrap_or("http://localhost:4317".to_string()),
        )
        .with_timeout(Duration::from_millis(1000))
        .build()
        .context("building the OTLP span exporter")?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_service_name("smartbus_maps")
                .build(),
        )
        .build();

    let tracer = provider.tracer("smartbus_maps");

    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let appender = tracing_appender::rolling::daily("./logs", "smartbus_maps.log");
    let (non_blocking_appender, _guard) = tracing_appender::non_blocking(appender);

    // A layer that logs events to rolling files.
    let file_log = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_appender)
        .with_ansi(false)
        .pretty();

    Registry::default()
        .with(telemetry_layer)
        .with(file_log)
        .with(env_filter)
        .init();

    let config = AppConfig::from_env();
    info!("backend base url: {}", config.base_url);

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .user_agent("smartbus-demo")
        .build()
        .context("building the http client")?;

    let backend = BackendClient::new(http.clone(), &config);

    match cli.command {
        Command::Render { route, dir, out } => {
            let renderer =
                RouteRenderer::new(OsrmClient::new(http, &config), config.map.clone());
            let container = format!("route-map-{route}");
            let controller = RouteDetailController::new(
                backend,
                renderer,
                TerminalView,
                route,
                container.clone(),
                config.map.focus_zoom,
            );

            controller.load_stops(dir).await;

            let map = controller
                .renderer()
                .registry()
                .snapshot(&container)
                .context("renderer left no map instance behind")?;
            let document = serde_json::to_string_pretty(&map.to_geojson())?;

            match out {
                Some(path) => {
                    std::fs::write(&path, document)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!("wrote {}", path.display());
                }
                None => println!("{document}"),
            }
        }
        Command::Summary { route } => {
            let summary = backend.route_summary(route).await?;
            print_summary(&summary);
        }
    }

    Ok(())
}

/// Detail view that narrates page updates to the log instead of a DOM.
struct TerminalView;

impl DetailView for TerminalView {
    fn set_active_direction(&self, dir: Direction) {
        info!("direction: {dir}");
    }

    fn show_status(&self, message: &str, variant: StatusVariant) {
        match variant {
            StatusVariant::Warning => warn!("{message}"),
            _ => info!("{message}"),
        }
    }

    fn set_loading(&self, loading: bool) {
        if loading {
            info!("loading…");
        }
    }

    fn reset_panel(&self) {}

    fn render_stop_list(&self, stops: &[StopGeo]) {
        for (idx, stop) in stops.iter().enumerate() {
            let position = stop.order.unwrap_or(idx as i32 + 1);
            let name = stop.name.as_deref().unwrap_or("");
            match stop.address.as_deref().filter(|a| !a.is_empty()) {
                Some(address) => info!("{position}. {name} — {address}"),
                None => info!("{position}. {name}"),
            }
        }
    }

    fn update_kpis(&self, kpis: StopKpis) {
        info!(
            "stops: {}, with coordinates: {}, status: {}",
            kpis.total,
            kpis.with_geo,
            kpis.status.label()
        );
    }
}

fn print_summary(summary: &RouteSummary) {
    let code = summary.route_code.as_deref().unwrap_or("—");
    let name = summary.route_name.as_deref().unwrap_or("—");
    println!("Route {code} — {name}");
    if summary.start.is_some() || summary.end.is_some() {
        println!(
            "  {} → {}",
            summary.start.as_deref().unwrap_or("—"),
            summary.end.as_deref().unwrap_or("—")
        );
    }
    for (label, stats) in [("DI", &summary.directions.di), ("VE", &summary.directions.ve)] {
        println!(
            "  {label}: {} stops, {} with coordinates ({})",
            stats.stops,
            stats.with_geo,
            if stats.shape_ok() { "OK" } else { "incomplete" }
        );
    }
    println!("  coverage: {}%", summary.totals.percent_with_geo);
    println!(
        "  data status: {}",
        summary.data_status.as_deref().unwrap_or("—")
    );
}
