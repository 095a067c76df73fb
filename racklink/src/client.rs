//! Protocol session with a single RackLink device

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use racklink_core::{
    Command, Envelope, Session, Subcommand,
    constants::{HEADER, LOGIN_ACCEPTED, LOGIN_SEPARATOR, outlet},
    decode,
    packet::{MAX_ENVELOPE_SIZE, OVERHEAD},
    parse_packet,
};
use racklink_transport::{TcpTransport, Transport};
use racklink_types::{Outlet, SensorKind};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// RackLink protocol client
///
/// Owns one connection and serializes every exchange on it: the protocol
/// has no request IDs, so a response always belongs to the last request.
/// Keepalive pings sent by the device while a response is pending are
/// answered on the same read path.
///
/// Failures never cross this boundary as errors: operations resolve to
/// `false`/`None` and log the cause. [`Client::try_send_command`] is the
/// one exception, for callers that need to tell a NACK from a timeout.
///
/// # Examples
///
/// ```no_run
/// use racklink::Client;
///
/// #[tokio::main]
/// async fn main() {
///     let mut client = Client::new("192.168.1.50", 60000);
///
///     if client.connect().await && client.login("user", "password").await {
///         println!("outlets: {:?}", client.outlet_count().await);
///     }
///
///     client.disconnect().await;
/// }
/// ```
pub struct Client {
    transport: Box<dyn Transport>,
    session: Session,
    timeout: Duration,
    ping_timeout: Duration,
}

impl Client {
    /// Create a new client (TCP transport)
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_transport(Box::new(TcpTransport::new(host, port)))
    }

    /// Create a client from connection settings
    pub fn from_config(config: &ClientConfig) -> Self {
        let transport = TcpTransport::new(config.host.clone(), config.port)
            .with_connect_timeout(config.connect_timeout);

        Self::with_transport(Box::new(transport))
            .with_timeout(config.command_timeout)
            .with_ping_timeout(config.ping_timeout)
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            session: Session::new(),
            timeout: Duration::from_secs(racklink_core::constants::DEFAULT_TIMEOUT),
            ping_timeout: Duration::from_secs(racklink_core::constants::DEFAULT_PING_TIMEOUT),
        }
    }

    /// Set login/command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set client ping timeout
    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    /// Shared session state
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.session.is_connected() && self.transport.is_connected()
    }

    pub fn remote_addr(&self) -> String {
        self.transport.remote_addr()
    }

    /// Open the TCP stream
    ///
    /// Returns false on timeout, refusal or any OS error.
    pub async fn connect(&mut self) -> bool {
        if self.is_connected() {
            return true;
        }

        // Stale stream after a half-observed failure
        self.transport.disconnect().await;
        self.session.close();

        debug!("Attempting to connect to {}", self.transport.remote_addr());

        match self.transport.connect().await {
            Ok(()) => {
                if let Err(e) = self.session.open() {
                    warn!("Session out of sync: {}", e);
                }
                info!("Connected to RackLink device at {}", self.transport.remote_addr());
                true
            }
            Err(e) => {
                error!(
                    "Failed to connect to RackLink device {}: {}",
                    self.transport.remote_addr(),
                    e
                );
                false
            }
        }
    }

    /// Disconnect from device
    ///
    /// Idempotent.
    pub async fn disconnect(&mut self) {
        if self.transport.is_connected() {
            info!("Disconnecting from {}...", self.transport.remote_addr());
        }

        self.transport.disconnect().await;
        self.session.close();
    }

    /// Log in with the plaintext `username|password` scheme
    ///
    /// After accepting the credentials the device sends a keepalive ping
    /// that must be answered. Some devices skip it, so a missing or
    /// unexpected packet at that point does not fail the login.
    pub async fn login(&mut self, username: &str, password: &str) -> bool {
        if !self.send_login(username, password).await {
            return false;
        }

        self.answer_initial_ping().await;
        true
    }

    /// Send credentials and check the device's verdict
    ///
    /// First half of [`Client::login`], without the ping exchange that
    /// follows an accepted login.
    pub async fn send_login(&mut self, username: &str, password: &str) -> bool {
        debug!("Attempting login for user: {}", username);

        let credentials = format!("{}{}{}", username, LOGIN_SEPARATOR, password);
        if !credentials.is_ascii() {
            error!("Login credentials must be ASCII");
            return false;
        }

        let request = Envelope::with_payload(Command::Login, Subcommand::Set, credentials.into_bytes());
        if let Err(e) = self.send_envelope(&request).await {
            error!("Failed to send login: {}", e);
            return false;
        }

        let deadline = Instant::now() + self.timeout;
        let response = match self.receive_envelope(deadline).await {
            Ok(response) => response,
            Err(e) => {
                let e = self.drop_on_timeout(e).await;
                error!("No response to login: {}", e);
                return false;
            }
        };

        if response.is_nack() {
            error!(
                "Login NACK received, error code: 0x{:02X}",
                decode::nack_code(&response.payload)
            );
            return false;
        }

        if response.is(Command::Login, Subcommand::Response)
            && response.payload.first() == Some(&LOGIN_ACCEPTED)
        {
            if let Err(e) = self.session.authenticate() {
                warn!("Session out of sync: {}", e);
            }
            info!("Login successful");
            return true;
        }

        error!("Login failed - unexpected response: {}", response);
        false
    }

    /// Send a client-initiated ping and wait for the reply
    ///
    /// Many devices only answer their own pings, so `false` is not a fault.
    pub async fn ping(&mut self) -> bool {
        let request = Envelope::new(Command::Ping, Subcommand::Set);

        debug!("Sending ping...");
        if let Err(e) = self.send_envelope(&request).await {
            debug!("Ping not sent: {}", e);
            return false;
        }

        match self.await_response(self.ping_timeout, true).await {
            Ok(response) if response.is(Command::Ping, Subcommand::Response) => {
                debug!("Ping successful");
                true
            }
            Ok(response) if response.is_nack() => {
                debug!(
                    "Ping received NACK, error: 0x{:02X}",
                    decode::nack_code(&response.payload)
                );
                false
            }
            Ok(response) => {
                debug!("Unexpected ping response: {}", response);
                false
            }
            Err(e) => {
                debug!("No response to ping ({}), device may not support client-initiated pings", e);
                false
            }
        }
    }

    /// Send a command and wait for its response
    ///
    /// Keeps the failure cause: [`Error::Nack`] when the device rejected
    /// the request, transport or protocol errors otherwise.
    pub async fn try_send_command(
        &mut self,
        command: impl Into<u8>,
        subcommand: impl Into<u8>,
        payload: &[u8],
    ) -> Result<Envelope> {
        let request = Envelope::with_payload(command, subcommand, Bytes::copy_from_slice(payload));

        debug!("Sending command: {}", request);
        self.send_envelope(&request).await?;

        let response = match self.await_response(self.timeout, false).await {
            Ok(response) => response,
            Err(e) => return Err(self.drop_on_timeout(e).await),
        };

        if response.is_nack() {
            return Err(Error::Nack {
                command: request.command,
                code: decode::nack_code(&response.payload),
            });
        }

        debug!("Response received: {}", response);
        Ok(response)
    }

    /// Send a command and wait for its response
    ///
    /// Resolves to `None` on NACK, timeout or connection loss.
    pub async fn send_command(
        &mut self,
        command: impl Into<u8>,
        subcommand: impl Into<u8>,
        payload: &[u8],
    ) -> Option<Envelope> {
        let command = command.into();

        match self.try_send_command(command, subcommand, payload).await {
            Ok(response) => Some(response),
            Err(Error::Nack { code, .. }) => {
                warn!("Command 0x{:02X} received NACK, error code: 0x{:02X}", command, code);
                None
            }
            Err(e) => {
                debug!("No response received for command 0x{:02X}: {}", command, e);
                None
            }
        }
    }

    /// Get the number of power outlets
    pub async fn outlet_count(&mut self) -> Option<u8> {
        let payload = self.query(Command::OutletCount, Subcommand::Get, &[]).await?;
        decode::outlet_count(&payload)
    }

    /// Get the power state of an outlet (1-based)
    pub async fn outlet_state(&mut self, index: u8) -> Option<bool> {
        let payload = self.query(Command::PowerOutlets, Subcommand::Get, &[index]).await?;
        decode::outlet_state(&payload)
    }

    /// Switch an outlet (1-based) on or off
    pub async fn set_outlet_state(&mut self, index: u8, on: bool) -> bool {
        let state = if on { outlet::ON } else { outlet::OFF };

        self.query(Command::PowerOutlets, Subcommand::Set, &[index, state])
            .await
            .is_some()
    }

    /// Get the name of an outlet (1-based)
    pub async fn outlet_name(&mut self, index: u8) -> Option<String> {
        let payload = self.query(Command::OutletName, Subcommand::Get, &[index]).await?;
        decode::outlet_name(&payload)
    }

    /// Read state and name of an outlet (1-based)
    ///
    /// Fields the device does not report keep their placeholder values.
    pub async fn outlet(&mut self, index: u8) -> Outlet {
        let state = self.outlet_state(index).await;
        let name = self.outlet_name(index).await;

        let mut outlet = Outlet::placeholder(index);
        outlet.state = state;
        if let Some(name) = name {
            outlet.name = name;
        }
        outlet
    }

    /// Read one sensor
    ///
    /// A missing or unparsable value is `None`.
    pub async fn sensor(&mut self, kind: SensorKind) -> Option<f64> {
        let command = sensor_command(kind);
        let payload = self.query(command, Subcommand::Get, &[]).await?;

        let value = decode::sensor_value(&payload);
        match value {
            Some(value) => debug!("Parsed {} reading: {}", kind, value),
            None => debug!("Unusable {} reading: {}", kind, hex::encode(&payload)),
        }
        value
    }

    /// Temperature in degrees Fahrenheit
    pub async fn temperature(&mut self) -> Option<f64> {
        self.sensor(SensorKind::Temperature).await
    }

    /// RMS voltage in volts
    pub async fn voltage(&mut self) -> Option<f64> {
        self.sensor(SensorKind::Voltage).await
    }

    /// RMS current in amperes
    pub async fn current(&mut self) -> Option<f64> {
        self.sensor(SensorKind::Current).await
    }

    /// Power in watts
    pub async fn power(&mut self) -> Option<f64> {
        self.sensor(SensorKind::Power).await
    }

    pub async fn power_factor(&mut self) -> Option<f64> {
        self.sensor(SensorKind::PowerFactor).await
    }

    pub async fn thermal_load(&mut self) -> Option<f64> {
        self.sensor(SensorKind::ThermalLoad).await
    }

    pub async fn occupancy(&mut self) -> Option<f64> {
        self.sensor(SensorKind::Occupancy).await
    }

    // Helper methods

    /// Exchange a command and return the payload of its matching RESPONSE
    async fn query(
        &mut self,
        command: Command,
        subcommand: Subcommand,
        payload: &[u8],
    ) -> Option<Bytes> {
        let response = self.send_command(command, subcommand, payload).await?;

        if !response.is(command, Subcommand::Response) {
            debug!("Invalid response for {}: {}", command, response);
            return None;
        }

        Some(response.payload)
    }

    /// Answer the ping a device sends right after accepting a login
    ///
    /// Returns true if a ping arrived and was answered. Its absence is not
    /// a failure and leaves the connection up.
    pub async fn answer_initial_ping(&mut self) -> bool {
        debug!("Waiting for initial ping from device...");

        let deadline = Instant::now() + self.timeout;
        match self.receive_envelope(deadline).await {
            Ok(envelope) if envelope.is_keepalive() => match self.answer_keepalive(&envelope).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to answer initial ping: {}", e);
                    false
                }
            },
            Ok(envelope) => {
                warn!("Expected ping after login, got {}", envelope);
                false
            }
            Err(e) => {
                warn!("No ping received after login ({}), but login was successful", e);
                false
            }
        }
    }

    async fn answer_keepalive(&mut self, ping: &Envelope) -> Result<()> {
        debug!("Received keepalive, responding...");

        let pong = Envelope::new(Command::Ping, Subcommand::Response).with_destination(ping.destination);
        self.send_envelope(&pong).await
    }

    /// Wait for the next non-keepalive envelope
    ///
    /// Ping replies are only returned while a client ping is pending. One
    /// arriving after its ping gave up is skipped.
    async fn await_response(&mut self, timeout: Duration, pong_expected: bool) -> Result<Envelope> {
        let deadline = Instant::now() + timeout;

        loop {
            let envelope = self.receive_envelope(deadline).await?;

            if envelope.is_keepalive() {
                self.answer_keepalive(&envelope).await?;
                continue;
            }

            if !pong_expected && envelope.is(Command::Ping, Subcommand::Response) {
                debug!("Discarding late ping reply");
                continue;
            }

            return Ok(envelope);
        }
    }

    /// Drop the connection when the device missed a response deadline
    ///
    /// A reply arriving later would otherwise be taken as the answer to
    /// the next request.
    async fn drop_on_timeout(&mut self, cause: Error) -> Error {
        if cause.is_timeout() {
            warn!("No response within {:?}, dropping connection", self.timeout);
            self.disconnect().await;
        }
        cause
    }

    async fn send_envelope(&mut self, envelope: &Envelope) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let packet = envelope.encode()?;

        trace!("Sending: {:?}", envelope);

        if let Err(e) = self.transport.write_all(&packet).await {
            debug!("Connection lost during send: {}", e);
            self.session.close();
            return Err(e.into());
        }

        Ok(())
    }

    /// Read one packet
    ///
    /// Bytes before a header are skipped. Once a header has been read the
    /// rest of the packet must follow before `deadline`; otherwise the
    /// stream position is unknown and the connection is dropped.
    async fn receive_envelope(&mut self, deadline: Instant) -> Result<Envelope> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let mut skipped = 0usize;
        loop {
            let byte = self.read(1, deadline).await?;
            if byte[0] == HEADER {
                break;
            }
            skipped += 1;
        }
        if skipped > 0 {
            warn!("Skipped {} bytes before packet header", skipped);
        }

        let length = match self.read(1, deadline).await {
            Ok(buf) => buf[0],
            Err(e) => return Err(self.desync(e).await),
        };

        if length as usize > MAX_ENVELOPE_SIZE {
            let e = Error::InvalidResponse(format!(
                "invalid length: {} (max {})",
                length, MAX_ENVELOPE_SIZE
            ));
            return Err(self.desync(e).await);
        }

        // escaped envelope, checksum and tail
        let rest = match self.read(length as usize + 2, deadline).await {
            Ok(buf) => buf,
            Err(e) => return Err(self.desync(e).await),
        };

        let mut packet = BytesMut::with_capacity(length as usize + OVERHEAD);
        packet.extend_from_slice(&[HEADER, length]);
        packet.extend_from_slice(&rest);

        match parse_packet(&packet) {
            Ok(envelope) => {
                trace!("Received: {:?}", envelope);
                Ok(envelope)
            }
            Err(e) => {
                warn!("Discarding malformed packet: {}", e);
                Err(e.into())
            }
        }
    }

    async fn read(&mut self, len: usize, deadline: Instant) -> Result<BytesMut> {
        let remaining = deadline.saturating_duration_since(Instant::now());

        match self.transport.read_exact(len, remaining).await {
            Ok(buf) => Ok(buf),
            Err(e) => {
                if e.drops_connection() {
                    self.session.close();
                }
                Err(e.into())
            }
        }
    }

    /// Drop a connection whose framing can no longer be trusted
    async fn desync(&mut self, cause: Error) -> Error {
        warn!("Incomplete packet ({}), dropping connection", cause);
        self.disconnect().await;
        cause
    }
}

fn sensor_command(kind: SensorKind) -> Command {
    match kind {
        SensorKind::Temperature => Command::Temperature,
        SensorKind::Voltage => Command::Voltage,
        SensorKind::Current => Command::Current,
        SensorKind::Power => Command::Power,
        SensorKind::PowerFactor => Command::PowerFactor,
        SensorKind::ThermalLoad => Command::ThermalLoad,
        SensorKind::Occupancy => Command::Occupancy,
    }
}
