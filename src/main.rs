use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod charts;
mod cluster;
mod config;
mod correlation;
mod dashboard;
mod error;
mod grouping;
mod interaction;
mod loader;
mod models;
mod report;
mod server;
mod stats;
mod summary;

use charts::ChartKind;
use config::{Config, DEFAULT_CONFIG_PATH};
use dashboard::Dashboard;

#[derive(Parser)]
#[command(name = "habits-dashboard")]
#[command(about = "Student habits vs. academic performance dashboard", long_about = None)]
struct Cli {
    /// Configuration file (defaults apply when it does not exist)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Student CSV, overriding `[data] path`
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive dashboard
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        debug: bool,
    },
    /// Print group and profile summaries
    Summary,
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write the initial figure JSON for one chart
    Figure {
        /// bar, scatter, heatmap, waffle, sankey or radar
        #[arg(long)]
        chart: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a default configuration file
    InitConfig,
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_dashboard(config: Config, data: Option<PathBuf>) -> anyhow::Result<Dashboard> {
    let path = data.unwrap_or_else(|| config.data.path.clone());
    let records = loader::load_students(&path)
        .with_context(|| format!("failed to load students from {}", path.display()))?;
    Ok(Dashboard::new(config, records))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig = cli.command {
        init_logging(cli.verbose);
        if cli.config.exists() {
            anyhow::bail!("{} already exists", cli.config.display());
        }
        std::fs::write(&cli.config, Config::default_toml())
            .with_context(|| format!("failed to write {}", cli.config.display()))?;
        println!("Config written to {}.", cli.config.display());
        return Ok(());
    }

    let mut config = Config::load_or_default(&cli.config)?;
    if let Commands::Serve { host, port, debug } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
        config.server.debug |= *debug;
    }
    init_logging(cli.verbose || config.server.debug);

    let dashboard = load_dashboard(config, cli.data)?;

    match cli.command {
        Commands::Serve { .. } => {
            server::serve(dashboard).await?;
        }
        Commands::Summary => {
            let (summaries, thresholds) = report::group_summaries(&dashboard)?;
            println!(
                "{} students, exam score thresholds {:.1} / {:.1}",
                dashboard.records.len(),
                thresholds[0],
                thresholds[1]
            );
            for summary in summaries.iter() {
                println!("{}", report::format_summary_line(summary));
            }

            match dashboard.clustering() {
                Ok(clustering) => {
                    let features: Vec<&str> =
                        clustering.features.iter().map(|f| f.column()).collect();
                    println!(
                        "Student profiles ({}; inertia {:.2}, {} rows dropped):",
                        features.join(", "),
                        clustering.inertia,
                        clustering.dropped
                    );
                    for profile in clustering.profiles(&dashboard.records).iter() {
                        println!(
                            "- {} ({} students, {:.1}% female)",
                            profile.name, profile.count, profile.pct_female
                        );
                    }
                }
                Err(e) => println!("Student profiles unavailable: {e}"),
            }
        }
        Commands::Report { out } => {
            let report = report::build_report(&dashboard, chrono::Utc::now().date_naive())?;
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Figure { chart, out } => {
            let kind: ChartKind = chart.parse()?;
            let figure = dashboard.figure(kind)?;
            let json = serde_json::to_string_pretty(&figure)?;
            match out {
                Some(out) => {
                    std::fs::write(&out, json)?;
                    println!("Figure written to {}.", out.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::InitConfig => {}
    }

    Ok(())
}
