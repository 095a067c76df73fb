//! Staged connectivity check
//!
//! Walks through the session one step at a time and reports each stage,
//! so a failing device shows where it stops cooperating.

use std::process::ExitCode;

use racklink::{Client, ClientConfig, Command, Envelope, LOGIN_SEPARATOR, Subcommand};

/// Outlets read in the state stage
const SAMPLE_OUTLETS: u8 = 8;

/// Format bytes as spaced upper-case hex
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn stage(number: u8, title: &str) {
    println!();
    println!("Test {}: {}", number, title);
    println!("{}", "-".repeat(60));
}

fn print_envelope(envelope: &Envelope) {
    println!("  Command: 0x{:02X}", envelope.command);
    println!("  Subcommand: 0x{:02X}", envelope.subcommand);
    println!("  Data: {}", hex_dump(&envelope.payload));
}

/// Run every stage against the configured device
///
/// Stops early when the connection or the login fails.
pub async fn run(config: &ClientConfig) -> ExitCode {
    let mut client = Client::from_config(config);

    println!("{}", "=".repeat(60));
    println!("RackLink diagnostics");
    println!("{}", "=".repeat(60));
    println!("Host: {}", client.remote_addr());
    println!("Username: {}", config.username);

    stage(1, "TCP connection");
    if !client.connect().await {
        println!("✗ TCP connection failed");
        return ExitCode::FAILURE;
    }
    println!("✓ TCP connection successful");

    stage(2, "Login");
    let credentials = format!("{}{}{}", config.username, LOGIN_SEPARATOR, config.password);
    match Envelope::with_payload(Command::Login, Subcommand::Set, credentials.into_bytes()).encode() {
        Ok(packet) => println!("Login packet: {}", hex_dump(&packet)),
        Err(e) => println!("✗ Cannot encode login packet: {}", e),
    }

    if !client.send_login(&config.username, &config.password).await {
        println!("✗ Login failed (rejected or no response)");
        client.disconnect().await;
        return ExitCode::FAILURE;
    }
    println!("✓ Login successful");

    stage(3, "Initial ping from device");
    if client.answer_initial_ping().await {
        println!("✓ Device sent ping, pong returned");
    } else {
        println!("! No ping received (normal for some devices)");
    }

    stage(4, "Client-initiated ping");
    if client.ping().await {
        println!("✓ Ping/pong successful");
    } else {
        println!("! No pong (many devices only answer their own pings)");
    }

    stage(5, "Outlet count");
    let count = client.outlet_count().await;
    match count {
        Some(count) => println!("✓ Outlet count: {}", count),
        None => {
            println!("✗ Failed to get outlet count");
            println!("Trying raw command...");
            match client.try_send_command(Command::OutletCount, Subcommand::Get, &[]).await {
                Ok(response) => print_envelope(&response),
                Err(e) => println!("✗ {}", e),
            }
        }
    }

    stage(6, "Outlet states");
    match count {
        Some(count) => {
            for index in 1..=count.min(SAMPLE_OUTLETS) {
                let outlet = client.outlet(index).await;
                match outlet.state {
                    Some(_) => println!("  Outlet {}: {} - {}", index, outlet.name, outlet.state_label()),
                    None => println!("  Outlet {}: Failed to get state", index),
                }
            }
        }
        None => println!("! Skipped, outlet count unknown"),
    }

    stage(7, "Raw command (get outlet 1)");
    match client.try_send_command(Command::PowerOutlets, Subcommand::Get, &[1]).await {
        Ok(response) => {
            println!("✓ Response received");
            print_envelope(&response);
        }
        Err(e) => println!("✗ {}", e),
    }

    client.disconnect().await;

    println!();
    println!("{}", "=".repeat(60));
    println!("Diagnostics complete");
    println!("{}", "=".repeat(60));

    ExitCode::SUCCESS
}
