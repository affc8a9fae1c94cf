//! Integration tests for the heart-rate peripheral firmware.
//!
//! Run after flashing the firmware. Needs a Bluetooth adapter on the host.

mod ble_client;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use ble_client::HrsClient;
use tests::{print_results, run_all_tests, TestConfig};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Integration tests for the heart-rate peripheral firmware")]
struct Args {
    /// Advertised device name
    #[arg(long, default_value = "HRS-Peripheral")]
    name: String,

    /// BLE scan timeout in seconds
    #[arg(long, default_value = "10")]
    scan_timeout: u64,

    /// Disconnect/reconnect cycles to run
    #[arg(long, default_value = "3")]
    reconnect_cycles: u32,

    /// Firmware was built with the environmental-sensing feature
    #[arg(long)]
    environmental_sensing: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("{}", "Heart-Rate Peripheral Integration Tests".bold());
    println!("Device: \"{}\"", args.name);
    println!();

    let config = TestConfig {
        name: args.name,
        scan_timeout: Duration::from_secs(args.scan_timeout),
        reconnect_cycles: args.reconnect_cycles,
        environmental_sensing: args.environmental_sensing,
    };

    println!("Scanning for \"{}\"...", config.name);
    let mut client = HrsClient::connect_by_name(&config.name, config.scan_timeout).await?;
    println!("{}", "Connected!".green());

    println!("\nRunning tests...\n");

    let results = run_all_tests(&mut client, &config).await;
    print_results(&results);

    let _ = client.disconnect().await;

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
