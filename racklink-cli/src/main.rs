//! RackLink command-line tool

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use racklink::{Client, ClientConfig, Poller, PollerConfig, SensorKind};

mod cli;
mod diagnose;
mod shell;

use cli::{Cli, Commands, Operation};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "racklink={level},racklink_core={level},racklink_transport={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = ClientConfig::new(cli.host.clone(), cli.password.clone())
        .with_port(cli.port)
        .with_username(cli.username.clone())
        .with_command_timeout(Duration::from_secs(cli.timeout));
    config.validate().context("invalid connection settings")?;

    let op = match cli.command {
        Commands::Watch { interval } => return watch(config, Duration::from_secs(interval)).await,
        Commands::Diagnose => return Ok(diagnose::run(&config).await),
        Commands::Shell => None,
        Commands::Op(op) => Some(op),
    };

    let mut client = Client::from_config(&config);

    println!("Connecting to {}...", client.remote_addr());
    if !client.connect().await {
        println!("✗ Connection failed!");
        return Ok(ExitCode::FAILURE);
    }

    if !client.login(&config.username, &config.password).await {
        println!("✗ Login failed!");
        client.disconnect().await;
        return Ok(ExitCode::FAILURE);
    }
    debug!("Logged in as {}", config.username);

    let result = match op {
        Some(op) => execute(&mut client, op).await,
        None => shell::run(&mut client).await,
    };
    client.disconnect().await;
    result?;

    Ok(ExitCode::SUCCESS)
}

async fn execute(client: &mut Client, op: Operation) -> Result<()> {
    match op {
        Operation::Ping => {
            if client.ping().await {
                println!("✓ Pong received!");
            } else {
                println!("✗ No pong (many devices only answer their own pings)");
            }
        }
        Operation::Count => match client.outlet_count().await {
            Some(count) => println!("✓ Found {} outlets", count),
            None => println!("✗ Failed to get outlet count"),
        },
        Operation::List => {
            let count = client
                .outlet_count()
                .await
                .context("could not get outlet count")?;

            println!("{:<8} {:<30} {:<10}", "Index", "Name", "State");
            println!("{}", "-".repeat(50));
            for index in 1..=count {
                let outlet = client.outlet(index).await;
                println!("{:<8} {:<30} {:<10}", index, outlet.name, outlet.state_label());
            }
        }
        Operation::Get { index } => {
            let outlet = client.outlet(index).await;
            match outlet.state {
                Some(_) => println!("✓ {}: {}", outlet.name, outlet.state_label()),
                None => println!("✗ Failed to get state for outlet {}", index),
            }
        }
        Operation::On { index } => switch(client, index, true).await,
        Operation::Off { index } => switch(client, index, false).await,
        Operation::Raw {
            command,
            subcommand,
            data,
        } => {
            let payload = cli::parse_data(&data).map_err(anyhow::Error::msg)?;

            println!("Sending command: 0x{:02X}, subcommand: 0x{:02X}", command, subcommand);
            if !payload.is_empty() {
                println!("Data: {}", hex::encode(&payload));
            }

            match client.try_send_command(command, subcommand, &payload).await {
                Ok(response) => {
                    println!("✓ Response received:");
                    println!("  Command: 0x{:02X}", response.command);
                    println!("  Subcommand: 0x{:02X}", response.subcommand);
                    println!("  Data: {}", hex::encode(&response.payload));
                    if !response.payload.is_empty() {
                        let ascii: String = response
                            .payload
                            .iter()
                            .filter(|b| b.is_ascii())
                            .map(|b| *b as char)
                            .collect();
                        println!("  ASCII: {}", ascii);
                    }
                }
                Err(e) => println!("✗ {}", e),
            }
        }
        Operation::Sensors => {
            for kind in SensorKind::ALL {
                print_sensor(kind, client.sensor(kind).await);
            }
        }
        Operation::Sensor { kind } => print_sensor(kind, client.sensor(kind).await),
    }

    Ok(())
}

async fn switch(client: &mut Client, index: u8, on: bool) {
    let label = if on { "ON" } else { "OFF" };

    println!("Setting outlet {} to {}...", index, label);
    if client.set_outlet_state(index, on).await {
        println!("✓ Outlet {} set to {}", index, label);
    } else {
        println!("✗ Failed to set outlet {}", index);
    }
}

fn print_sensor(kind: SensorKind, value: Option<f64>) {
    match value {
        Some(value) => println!("{:<14} {} {}", kind.name(), value, kind.unit()),
        None => println!("{:<14} unavailable", kind.name()),
    }
}

async fn watch(config: ClientConfig, interval: Duration) -> Result<ExitCode> {
    let poller = Poller::new(PollerConfig::new(config).with_poll_interval(interval))
        .context("invalid polling settings")?;

    let handle = Arc::new(poller).spawn();
    let mut updates = handle.updates();

    println!("Polling every {}s, Ctrl-C to stop", interval.as_secs());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }

                let Some(snapshot) = updates.borrow_and_update().clone() else {
                    continue;
                };

                println!("\n{}", snapshot);
                for outlet in snapshot.outlets.values() {
                    println!("  {:<4} {:<30} {}", outlet.index, outlet.name, outlet.state_label());
                }
                for (kind, value) in &snapshot.sensors {
                    if let Some(value) = value {
                        println!("  {:<14} {} {}", kind.name(), value, kind.unit());
                    }
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(ExitCode::SUCCESS)
}
