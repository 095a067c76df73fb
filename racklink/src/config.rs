//! Connection and polling settings

use std::fmt;
use std::time::Duration;

use racklink_core::{DEFAULT_PORT, constants};
use racklink_types::Error;

/// Settings for one device connection
#[derive(Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,

    /// Upper bound for establishing the TCP stream
    pub connect_timeout: Duration,

    /// Wait for the response to a login or command
    pub command_timeout: Duration,

    /// Wait for the response to a client ping
    pub ping_timeout: Duration,
}

impl ClientConfig {
    /// Create settings with the default port, user and timeouts
    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: constants::DEFAULT_USERNAME.to_string(),
            password: password.into(),
            connect_timeout: Duration::from_secs(constants::DEFAULT_TIMEOUT),
            command_timeout: Duration::from_secs(constants::DEFAULT_TIMEOUT),
            ping_timeout: Duration::from_secs(constants::DEFAULT_PING_TIMEOUT),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    /// Check settings before opening a connection
    pub fn validate(&self) -> racklink_types::Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Validation("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(Error::Validation("port must not be 0".into()));
        }
        if self.username.contains(constants::LOGIN_SEPARATOR) {
            return Err(Error::Validation(format!(
                "username must not contain '{}'",
                constants::LOGIN_SEPARATOR
            )));
        }
        if !self.username.is_ascii() || !self.password.is_ascii() {
            return Err(Error::Validation("credentials must be ASCII".into()));
        }
        if self.connect_timeout.is_zero()
            || self.command_timeout.is_zero()
            || self.ping_timeout.is_zero()
        {
            return Err(Error::Validation("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("connect_timeout", &self.connect_timeout)
            .field("command_timeout", &self.command_timeout)
            .field("ping_timeout", &self.ping_timeout)
            .finish()
    }
}

/// Settings for the polling driver
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub client: ClientConfig,

    /// Delay between polling cycles
    pub poll_interval: Duration,

    /// Outlet count used when the device reports no usable one
    pub default_outlet_count: u8,

    /// Largest outlet count accepted from the device
    pub max_outlets: u8,

    /// Send a client ping at the start of every cycle
    pub ping_on_refresh: bool,

    /// Read sensors in every cycle
    pub poll_sensors: bool,
}

impl PollerConfig {
    pub fn new(client: ClientConfig) -> Self {
        Self {
            client,
            poll_interval: Duration::from_secs(constants::DEFAULT_POLL_INTERVAL),
            default_outlet_count: constants::outlet::DEFAULT_COUNT,
            max_outlets: constants::outlet::MAX_COUNT,
            ping_on_refresh: true,
            poll_sensors: true,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_outlet_limits(mut self, default_count: u8, max_count: u8) -> Self {
        self.default_outlet_count = default_count;
        self.max_outlets = max_count;
        self
    }

    pub fn with_ping_on_refresh(mut self, enabled: bool) -> Self {
        self.ping_on_refresh = enabled;
        self
    }

    pub fn with_sensors(mut self, enabled: bool) -> Self {
        self.poll_sensors = enabled;
        self
    }

    /// Check whether a device-reported outlet count is usable
    pub fn accepts_outlet_count(&self, count: u8) -> bool {
        (1..=self.max_outlets).contains(&count)
    }

    pub fn validate(&self) -> racklink_types::Result<()> {
        self.client.validate()?;

        if self.poll_interval.is_zero() {
            return Err(Error::Validation("poll interval must be non-zero".into()));
        }
        if !self.accepts_outlet_count(self.default_outlet_count) {
            return Err(Error::Validation(format!(
                "default outlet count {} outside 1..={}",
                self.default_outlet_count, self.max_outlets
            )));
        }
        Ok(())
    }
}
