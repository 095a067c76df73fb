//! Outlet control example

use std::time::Duration;
use tokio::time::sleep;
use racklink::{Client, DEFAULT_PORT, DEFAULT_USERNAME};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let host = std::env::var("RACKLINK_HOST").unwrap_or_else(|_| "192.168.1.50".to_string());
    let password = std::env::var("RACKLINK_PASSWORD").unwrap_or_default();
    let outlet: u8 = std::env::var("RACKLINK_OUTLET")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);

    let mut client = Client::new(host, DEFAULT_PORT);

    if !client.connect().await || !client.login(DEFAULT_USERNAME, &password).await {
        eprintln!("Could not log in");
        return;
    }

    println!("Device connected!");

    // Power cycle
    println!("Turning outlet {} off...", outlet);
    if !client.set_outlet_state(outlet, false).await {
        eprintln!("✗ Failed to turn outlet {} off, leaving it alone", outlet);
        client.disconnect().await;
        return;
    }
    println!("✓ Outlet {} is off", outlet);
    sleep(Duration::from_secs(3)).await;

    println!("Turning outlet {} on...", outlet);
    if client.set_outlet_state(outlet, true).await {
        println!("✓ Outlet {} is on", outlet);
    } else {
        eprintln!("✗ Failed to turn outlet {} back on", outlet);
    }

    match client.outlet_state(outlet).await {
        Some(on) => println!("Outlet {} reports {}", outlet, if on { "ON" } else { "OFF" }),
        None => println!("Outlet {} state unknown", outlet),
    }

    client.disconnect().await;
}
