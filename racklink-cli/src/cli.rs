//! Command-line interface definition

use clap::{Parser, Subcommand};

use racklink::{DEFAULT_PORT, DEFAULT_USERNAME, SensorKind};

/// RackLink - control networked power distribution units
#[derive(Parser, Debug)]
#[command(name = "racklink", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Device hostname or IP address
    #[arg(env = "RACKLINK_HOST")]
    pub host: String,

    /// Device port
    #[arg(short, long, env = "RACKLINK_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Login user
    #[arg(short, long, env = "RACKLINK_USERNAME", default_value = DEFAULT_USERNAME)]
    pub username: String,

    /// Login password
    #[arg(short = 'P', long, env = "RACKLINK_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Command timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Op(Operation),

    /// Run commands interactively on one session
    Shell,

    /// Step through connection, login and basic queries, reporting each stage
    Diagnose,

    /// Poll the device and print every snapshot until Ctrl-C
    Watch {
        /// Poll interval in seconds
        #[arg(short, long, default_value_t = 30)]
        interval: u64,
    },
}

/// Commands that run on a logged-in session
#[derive(Subcommand, Debug)]
pub enum Operation {
    /// Send a ping and wait for the reply
    Ping,

    /// Show the number of outlets
    Count,

    /// List all outlets with name and state
    List,

    /// Show one outlet
    Get {
        /// Outlet index (1-based)
        index: u8,
    },

    /// Turn an outlet on
    On {
        /// Outlet index (1-based)
        index: u8,
    },

    /// Turn an outlet off
    Off {
        /// Outlet index (1-based)
        index: u8,
    },

    /// Send a raw command
    Raw {
        /// Command code in hex (e.g. 22 or 0x22)
        #[arg(value_parser = parse_byte)]
        command: u8,

        /// Subcommand code in hex (e.g. 02 or 0x02)
        #[arg(value_parser = parse_byte)]
        subcommand: u8,

        /// Payload as hex bytes, or ASCII text when not hex
        data: Vec<String>,
    },

    /// Read all sensors
    Sensors,

    /// Read one sensor
    Sensor {
        /// temperature, voltage, current, power, power_factor, thermal_load or occupancy
        kind: SensorKind,
    },
}

/// Parse a hex byte with optional `0x` prefix
pub fn parse_byte(s: &str) -> Result<u8, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);

    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid hex byte '{}': {}", s, e))
}

/// Parse raw command data
///
/// Words made only of hex digits are read as byte pairs (a trailing odd
/// digit is dropped); anything else is sent as ASCII.
pub fn parse_data(words: &[String]) -> Result<Vec<u8>, String> {
    let text = words.join(" ");

    if text.is_empty() {
        return Ok(Vec::new());
    }

    if text.chars().all(|c| c.is_ascii_hexdigit() || c == ' ') {
        let clean: String = text.chars().filter(|c| *c != ' ').collect();
        let even = clean.len() - clean.len() % 2;
        return hex::decode(&clean[..even]).map_err(|e| e.to_string());
    }

    if !text.is_ascii() {
        return Err(format!("data must be hex or ASCII: {}", text));
    }

    Ok(text.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_byte() {
        assert_eq!(parse_byte("22"), Ok(0x22));
        assert_eq!(parse_byte("0x50"), Ok(0x50));
        assert_eq!(parse_byte("fe"), Ok(0xFE));
        assert!(parse_byte("100").is_err());
        assert!(parse_byte("zz").is_err());
    }

    #[test]
    fn test_parse_data_hex() {
        assert_eq!(parse_data(&words("01 02")), Ok(vec![0x01, 0x02]));
        assert_eq!(parse_data(&words("0a0b")), Ok(vec![0x0A, 0x0B]));
        assert_eq!(parse_data(&words("abc")), Ok(vec![0xAB]));
        assert_eq!(parse_data(&[]), Ok(vec![]));
    }

    #[test]
    fn test_parse_data_ascii() {
        assert_eq!(parse_data(&words("user|pw")), Ok(b"user|pw".to_vec()));
        assert_eq!(parse_data(&words("hello world")), Ok(b"hello world".to_vec()));
        assert!(parse_data(&words("café")).is_err());
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from([
            "racklink", "10.0.0.5", "-P", "secret", "raw", "0x22", "02",
        ])
        .unwrap();

        assert_eq!(cli.port, DEFAULT_PORT);
        assert_eq!(cli.username, "user");
        assert!(matches!(
            cli.command,
            Commands::Op(Operation::Raw { command: 0x22, subcommand: 0x02, ref data }) if data.is_empty()
        ));

        let cli = Cli::try_parse_from([
            "racklink", "10.0.0.5", "-P", "secret", "sensor", "power-factor",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Op(Operation::Sensor { kind: SensorKind::PowerFactor })
        ));
    }

    #[test]
    fn test_parse_session_commands() {
        let parse = |args: &[&str]| {
            let mut argv = vec!["racklink", "10.0.0.5", "-P", "secret"];
            argv.extend_from_slice(args);
            Cli::try_parse_from(argv).unwrap().command
        };

        assert!(matches!(parse(&["shell"]), Commands::Shell));
        assert!(matches!(parse(&["diagnose"]), Commands::Diagnose));
        assert!(matches!(parse(&["watch", "-i", "5"]), Commands::Watch { interval: 5 }));
        assert!(matches!(parse(&["on", "3"]), Commands::Op(Operation::On { index: 3 })));
    }
}
