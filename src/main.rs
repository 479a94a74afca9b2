use clap::Parser;
use flightpay::application::monitor::{AutoPayMonitor, CycleOutcome};
use flightpay::application::registry::FlightRegistry;
use flightpay::application::simulator::Simulator;
use flightpay::config::AutoPayConfig;
use flightpay::infrastructure::contract::MockContract;
use flightpay::infrastructure::in_memory::InMemoryFlightStore;
use flightpay::infrastructure::notifier::TracingNotifier;
use flightpay::interfaces::csv::event_reader::EventReader;
use flightpay::interfaces::csv::manifest_writer::ManifestWriter;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input events CSV file
    input: PathBuf,

    /// Auto-pay configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Delay threshold in minutes, overriding the configuration
    #[arg(long)]
    threshold: Option<u32>,

    /// Run one auto-pay cycle after replaying the events
    #[arg(long)]
    auto_pay: bool,

    /// Start without the demo flights
    #[arg(long)]
    empty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AutoPayConfig::from_path(path).into_diagnostic()?,
        None => AutoPayConfig::default(),
    };
    if let Some(threshold) = cli.threshold {
        config.delay_threshold_minutes = threshold;
    }
    if cli.auto_pay {
        config.enabled = true;
    }

    let registry = if cli.empty {
        FlightRegistry::new(Box::new(InMemoryFlightStore::new()))
    } else {
        FlightRegistry::with_demo_flights().await.into_diagnostic()?
    };
    let registry = Arc::new(registry.with_rules(config.rules()));

    let contract = MockContract::new();
    let monitor = AutoPayMonitor::new(
        registry.clone(),
        Arc::new(contract.clone()),
        Arc::new(TracingNotifier),
        config,
    );
    let simulator = Simulator::new(registry, contract, monitor);

    // Replay events
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    for event_result in reader.events() {
        match event_result {
            Ok(event) => {
                if let Err(e) = simulator.process_event(event).await {
                    eprintln!("Error processing event: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    if cli.auto_pay {
        match simulator.monitor().run_cycle().await {
            CycleOutcome::Paid(summary) => {
                info!(
                    processed = summary.processed,
                    total = %summary.total_amount,
                    "auto-pay cycle paid out"
                );
            }
            CycleOutcome::Failed { attempts } => {
                eprintln!("Auto-pay cycle failed after {} attempts", attempts);
            }
            outcome => info!(?outcome, "auto-pay cycle finished"),
        }
    }

    // Output final manifest
    let rows = simulator.manifest().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = ManifestWriter::new(stdout.lock());
    writer.write_manifest(rows).into_diagnostic()?;

    Ok(())
}
