//! Polling example
//!
//! Prints a snapshot every 10 seconds until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use racklink::{ClientConfig, Poller, PollerConfig};

#[tokio::main]
async fn main() -> racklink::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let host = std::env::var("RACKLINK_HOST").unwrap_or_else(|_| "192.168.1.50".to_string());
    let password = std::env::var("RACKLINK_PASSWORD").unwrap_or_default();

    let config = PollerConfig::new(ClientConfig::new(host, password))
        .with_poll_interval(Duration::from_secs(10));

    let handle = Arc::new(Poller::new(config)?).spawn();
    let mut updates = handle.updates();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(snapshot) = updates.borrow_and_update().clone() {
                    println!("{}", snapshot);
                    for outlet in snapshot.outlets.values() {
                        println!("  {}", outlet);
                    }
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}
