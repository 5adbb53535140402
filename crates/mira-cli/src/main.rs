//! Command-line interface for Mira extension routing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mira_extensions::config::{env_vars, ExtensionConfig};
use mira_extensions::mount::{default_host_routes, find_route, IntegrationOutcome};
use mira_extensions::{ExtensionPipeline, RouteRecord, RouteTarget};

/// Mira - inspect runtime extension routes.
#[derive(Parser, Debug)]
#[command(name = "mira")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Registry API root (serves /extension-routes).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Root that relative extension component paths are served from.
    #[arg(long, global = true)]
    extension_base_url: Option<String>,

    /// JSON config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Build the host route tree with extension routes mounted and print it.
    Routes {
        /// Print the tree as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List extension collections.
    Collections,
    /// Load one extension route and print its rendered HTML.
    Render {
        /// Route name, e.g. `Gallery`.
        #[arg(required = true)]
        route_name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = build_config(&args)?;
    tracing::debug!("Using registry {}", config.api_base_url);

    match args.command {
        Command::Routes { json } => print_routes(&config, json).await,
        Command::Collections => print_collections(&config).await,
        Command::Render { route_name } => render_route(&config, &route_name).await,
    }
}

fn init_logging(verbose: bool) {
    let json_logging = std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            tracing_subscriber::EnvFilter::new("mira=debug,mira_extensions=debug")
        } else {
            tracing_subscriber::EnvFilter::new("mira=info,mira_extensions=info")
        }
    });

    // Logs go to stderr so `routes --json` stays pipeable.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .init();
    }
}

/// Config file or environment, then command-line flags on top.
fn build_config(args: &Args) -> Result<ExtensionConfig> {
    let mut config = match &args.config {
        Some(path) => ExtensionConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ExtensionConfig::from_env(),
    };

    if let Some(url) = &args.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(url) = &args.extension_base_url {
        config.extension_base_url = url.clone();
    }
    Ok(config.normalized())
}

async fn build_host_routes(config: &ExtensionConfig) -> Result<(Vec<RouteRecord>, IntegrationOutcome)> {
    let pipeline =
        ExtensionPipeline::from_config(config).context("Failed to set up extension pipeline")?;
    let mut routes = default_host_routes();
    let report = pipeline.generate(&mut routes).await;

    for collision in &report.collisions {
        tracing::warn!(
            "Dropped alias {} at {} ({:?} taken by {})",
            collision.alias_name,
            collision.path,
            collision.kind,
            collision.existing_route
        );
    }
    Ok((routes, report.outcome))
}

async fn print_routes(config: &ExtensionConfig, json: bool) -> Result<()> {
    let (routes, outcome) = build_host_routes(config).await?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&routes).context("Failed to serialize route tree")?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("Route Tree:");
    println!("===========\n");
    for route in &routes {
        print_route(route, 0);
    }

    if let Some(e) = outcome.error() {
        println!("\n{}, extension routes skipped", e);
    } else if outcome == IntegrationOutcome::Empty {
        println!("\nNo extension routes available");
    } else {
        println!(
            "\n{} extension routes mounted under {}",
            outcome.mounted(),
            config.mount_route_name
        );
    }
    Ok(())
}

fn print_route(route: &RouteRecord, depth: usize) {
    println!("{}{}", "  ".repeat(depth), describe_route(route));
    for child in &route.children {
        print_route(child, depth + 1);
    }
}

fn describe_route(route: &RouteRecord) -> String {
    let target = match &route.target {
        Some(RouteTarget::View(view)) => format!("view {}", view),
        Some(RouteTarget::Redirect(to)) => format!("-> {}", to),
        Some(RouteTarget::Extension(unit)) => format!("extension ({})", unit.strategy()),
        None => "layout".to_string(),
    };

    let mut flags = Vec::new();
    if route.meta.hide_in_menu {
        flags.push("hidden");
    }
    if route.meta.is_simple_alias {
        flags.push("simple-alias");
    } else if route.meta.is_alias {
        flags.push("alias");
    }

    let mut line = format!("{} {} [{}]", route.name, route.path, target);
    if !flags.is_empty() {
        line.push_str(&format!(" {{{}}}", flags.join(", ")));
    }
    line
}

async fn print_collections(config: &ExtensionConfig) -> Result<()> {
    let pipeline =
        ExtensionPipeline::from_config(config).context("Failed to set up extension pipeline")?;
    let (_, collections) = pipeline.fetcher().fetch_collections().await;

    println!("Extension Collections:");
    println!("======================\n");

    if collections.is_empty() {
        println!("No collections found at {}", config.api_base_url);
        return Ok(());
    }
    for collection in &collections {
        println!("  {} ({})", collection.name, collection.id);
        println!("    Routes: {}", collection.route_count);
    }
    Ok(())
}

async fn render_route(config: &ExtensionConfig, route_name: &str) -> Result<()> {
    let (routes, _) = build_host_routes(config).await?;

    let route = find_route(&routes, route_name)
        .with_context(|| format!("Route {} not found", route_name))?;
    let unit = route.extension_unit().with_context(|| {
        format!("Route {} is not an extension route ({})", route_name, route.path)
    })?;

    let rendered = unit.load().await;
    if rendered.is_diagnostic() {
        tracing::warn!("{} rendered a diagnostic panel", route_name);
    }
    println!("{}", rendered.to_html());
    Ok(())
}
