//! In-process fake RackLink device for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use racklink::{ClientConfig, Command, Envelope, PollerConfig, Subcommand};
use racklink_core::constants::HEADER;
use racklink_core::parse_packet;

static INIT: Once = Once::new();

/// Install a test subscriber once per binary (RUST_LOG to enable)
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub const PASSWORD: &str = "secret";

/// How the fake device answers
#[derive(Debug, Clone)]
pub struct Behavior {
    pub password: String,

    /// Send a keepalive right after accepting a login
    pub ping_after_login: bool,

    /// Answer client-initiated pings
    pub answer_pings: bool,

    /// Send a keepalive before every command response
    pub keepalive_before_response: bool,

    /// Raw outlet count byte, `None` answers with NACK
    pub outlet_count: Option<u8>,

    /// Outlets by 1-based index: (name, on)
    pub outlets: BTreeMap<u8, (String, bool)>,

    /// Sensor replies by command code, raw ASCII
    pub sensors: BTreeMap<u8, String>,

    /// NACK every GET with this code
    pub nack_gets: Option<u8>,

    /// Hold back the reply to the first GET (across all connections)
    pub delay_first_get: Option<Duration>,
}

impl Default for Behavior {
    fn default() -> Self {
        let outlets = [(1, "Router", true), (2, "Switch", false)]
            .into_iter()
            .map(|(i, name, on)| (i, (name.to_string(), on)))
            .collect();

        let sensors = [
            (Command::Temperature, "72.5,\0"),
            (Command::Voltage, "120.4"),
            (Command::Current, ",\0"),
            (Command::Power, " 45 ,\0"),
        ]
        .into_iter()
        .map(|(cmd, value)| (u8::from(cmd), value.to_string()))
        .collect();

        Self {
            password: PASSWORD.to_string(),
            ping_after_login: true,
            answer_pings: true,
            keepalive_before_response: false,
            outlet_count: Some(2),
            outlets,
            sensors,
            nack_gets: None,
            delay_first_get: None,
        }
    }
}

/// Fake device listening on a loopback port
pub struct FakeDevice {
    pub addr: SocketAddr,
    state: Arc<DeviceState>,
    task: JoinHandle<()>,
}

struct DeviceState {
    behavior: Mutex<Behavior>,
    connections: AtomicUsize,
    pongs: AtomicUsize,
    received: Mutex<Vec<Envelope>>,
    pending_delay: Mutex<Option<Duration>>,
}

impl FakeDevice {
    pub async fn start(behavior: Behavior) -> Self {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(DeviceState {
            pending_delay: Mutex::new(behavior.delay_first_get),
            behavior: Mutex::new(behavior),
            connections: AtomicUsize::new(0),
            pongs: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        });

        let shared = state.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                shared.connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream, shared.clone()));
            }
        });

        Self { addr, state, task }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Connections accepted so far
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Keepalive replies received so far
    pub fn pongs(&self) -> usize {
        self.state.pongs.load(Ordering::SeqCst)
    }

    /// Requests received with the given command, keepalive replies excluded
    pub fn requests(&self, command: Command) -> usize {
        self.state
            .received
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.command == u8::from(command))
            .count()
    }

    pub fn outlet_is_on(&self, index: u8) -> Option<bool> {
        self.state
            .behavior
            .lock()
            .unwrap()
            .outlets
            .get(&index)
            .map(|(_, on)| *on)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new("127.0.0.1", PASSWORD)
            .with_port(self.port())
            .with_command_timeout(Duration::from_millis(500))
            .with_ping_timeout(Duration::from_millis(100))
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig::new(self.client_config())
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut stream: TcpStream, state: Arc<DeviceState>) {
    while let Some(request) = read_envelope(&mut stream).await {
        if request.is(Command::Ping, Subcommand::Response) {
            state.pongs.fetch_add(1, Ordering::SeqCst);
            continue;
        }

        state.received.lock().unwrap().push(request.clone());

        let (replies, keepalive) = {
            let mut behavior = state.behavior.lock().unwrap();
            let keepalive = behavior.keepalive_before_response
                && !request.is(Command::Login, Subcommand::Set);
            (respond(&mut behavior, &request), keepalive)
        };

        if replies.is_empty() {
            continue;
        }

        if request.subcommand() == Some(Subcommand::Get) {
            let delay = state.pending_delay.lock().unwrap().take();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }

        if keepalive {
            let ping = Envelope::new(Command::Ping, Subcommand::Set);
            if write_envelope(&mut stream, &ping).await.is_err() {
                return;
            }
        }

        for reply in replies {
            if write_envelope(&mut stream, &reply).await.is_err() {
                return;
            }
        }
    }
}

fn nack(code: u8) -> Envelope {
    Envelope::with_payload(Command::Nack, Subcommand::Response, vec![code])
}

fn response(command: Command, payload: Vec<u8>) -> Envelope {
    Envelope::with_payload(command, Subcommand::Response, payload)
}

fn respond(behavior: &mut Behavior, request: &Envelope) -> Vec<Envelope> {
    let Some(command) = request.command() else {
        return vec![nack(0x01)];
    };
    let sub = request.subcommand();
    let payload = request.payload.as_ref();

    if sub == Some(Subcommand::Get) {
        if let Some(code) = behavior.nack_gets {
            return vec![nack(code)];
        }
    }

    match (command, sub) {
        (Command::Login, Some(Subcommand::Set)) => {
            let expected = format!("user|{}", behavior.password);
            if payload != expected.as_bytes() {
                return vec![nack(0x02)];
            }

            let mut replies = vec![response(Command::Login, vec![0x01])];
            if behavior.ping_after_login {
                replies.push(Envelope::new(Command::Ping, Subcommand::Set));
            }
            replies
        }
        (Command::Ping, Some(Subcommand::Set)) => {
            if behavior.answer_pings {
                vec![Envelope::new(Command::Ping, Subcommand::Response)]
            } else {
                vec![]
            }
        }
        (Command::OutletCount, Some(Subcommand::Get)) => match behavior.outlet_count {
            Some(count) => vec![response(Command::OutletCount, vec![count])],
            None => vec![nack(0x05)],
        },
        (Command::PowerOutlets, Some(Subcommand::Get)) => {
            match payload.first().and_then(|i| behavior.outlets.get(i).map(|o| (*i, o))) {
                Some((i, (_, on))) => vec![response(Command::PowerOutlets, vec![i, *on as u8])],
                None => vec![nack(0x05)],
            }
        }
        (Command::PowerOutlets, Some(Subcommand::Set)) => match payload {
            [i, state] => match behavior.outlets.get_mut(i) {
                Some(outlet) => {
                    outlet.1 = *state == 0x01;
                    vec![response(Command::PowerOutlets, vec![*i, *state])]
                }
                None => vec![nack(0x05)],
            },
            _ => vec![nack(0x03)],
        },
        (Command::OutletName, Some(Subcommand::Get)) => {
            match payload.first().and_then(|i| behavior.outlets.get(i).map(|o| (*i, o))) {
                Some((i, (name, _))) => {
                    let mut data = vec![i];
                    data.extend_from_slice(name.as_bytes());
                    data.extend_from_slice(&[0, 0, 0]);
                    vec![response(Command::OutletName, data)]
                }
                None => vec![nack(0x05)],
            }
        }
        (cmd, Some(Subcommand::Get)) if cmd.is_sensor() => {
            match behavior.sensors.get(&u8::from(cmd)) {
                Some(value) => vec![response(cmd, value.as_bytes().to_vec())],
                None => vec![nack(0x05)],
            }
        }
        _ => vec![nack(0x01)],
    }
}

async fn read_envelope(stream: &mut TcpStream) -> Option<Envelope> {
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte).await.ok()?;
        if byte[0] == HEADER {
            break;
        }
    }

    stream.read_exact(&mut byte).await.ok()?;
    let length = byte[0];

    let mut rest = vec![0u8; length as usize + 2];
    stream.read_exact(&mut rest).await.ok()?;

    let mut packet = vec![HEADER, length];
    packet.extend_from_slice(&rest);

    parse_packet(&packet).ok()
}

async fn write_envelope(stream: &mut TcpStream, envelope: &Envelope) -> std::io::Result<()> {
    let packet = envelope.encode().unwrap();
    stream.write_all(&packet).await?;
    stream.flush().await
}

/// Port with nothing listening on it
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
