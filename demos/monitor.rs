//! Interactive MedCooler monitor
//!
//! Scans for the cooler, polls its temperature and prints readings,
//! alerts and connection changes as they happen.
//!
//! Commands (type and press Enter):
//! - `s`: scan and connect
//! - `u`: toggle between Celsius and Fahrenheit
//! - `d`: disconnect
//! - `q`: quit
//!
//! Run with: cargo run --example monitor
//!
//! To use a lower alert threshold:
//!   cargo run --example monitor -- --threshold 5.0

use medcooler_ble::{BroadcastSink, BtleplugTransport, MonitorConfig, Orchestrator, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,medcooler_ble=info".into()),
        )
        .init();

    println!("MedCooler Monitor");
    println!("=================\n");

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let threshold = args
        .iter()
        .position(|arg| arg == "--threshold")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse::<f64>().ok());

    let mut config = MonitorConfig::default();
    if let Some(celsius) = threshold {
        config = config.with_threshold_celsius(celsius);
    }
    println!(
        "Alert threshold: {:.2}°C / {:.2}°F",
        config.alert.threshold.celsius, config.alert.threshold.fahrenheit
    );
    println!("Commands: [s]can  [u]nit  [d]isconnect  [q]uit\n");

    let scanner = BtleplugTransport::new().await?;
    let transport = scanner.sibling();
    let sink = BroadcastSink::new();

    let mut readings = sink.subscribe_readings();
    let mut alerts = sink.subscribe_alerts();

    let (monitor, handle) = Orchestrator::new(scanner, transport, sink.clone(), sink, config)?;
    let mut connection = monitor.subscribe_connection();
    let run = tokio::spawn(monitor.run());

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = stdin.next_line() => {
                let Ok(Some(line)) = line else { break };
                match line.trim() {
                    "s" => handle.start_scan()?,
                    "u" => handle.toggle_unit()?,
                    "d" => handle.disconnect()?,
                    "q" => break,
                    "" => {}
                    other => println!("Unknown command: {}", other),
                }
            }
            event = connection.recv() => match event {
                Ok(event) => println!("[{}] -> [{}]", event.previous, event.state),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            update = readings.recv() => match update {
                Ok(update) => println!("Temperature: {}", update.display_text()),
                Err(RecvError::Lagged(n)) => println!("(skipped {} readings)", n),
                Err(RecvError::Closed) => break,
            },
            alert = alerts.recv() => {
                if let Ok(alert) = alert {
                    let bell = if alert.should_ring { "\x07" } else { "" };
                    println!("{}*** {} {} ***", bell, alert.title(), alert.message());
                }
            }
        }
    }

    println!("\nShutting down...");
    // The orchestrator may already be gone if its channels closed.
    let _ = handle.shutdown();
    let _ = run.await;

    println!("Done!");
    Ok(())
}
