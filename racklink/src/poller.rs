//! Periodic device polling

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use racklink_types::{DeviceSnapshot, SensorKind};

use crate::client::Client;
use crate::config::PollerConfig;
use crate::error::{Error, Result};

/// Polling driver for one device
///
/// Produces [`DeviceSnapshot`]s and executes power changes. The client is
/// held for a whole cycle, so refreshes and power changes never
/// interleave on the connection.
pub struct Poller {
    config: PollerConfig,
    client: Mutex<Client>,
    latest: watch::Sender<Option<DeviceSnapshot>>,
}

impl Poller {
    /// Create a poller from validated settings
    ///
    /// No connection is made until the first refresh.
    pub fn new(config: PollerConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::from_config(&config.client);
        Ok(Self::with_client(config, client))
    }

    /// Create a poller around an existing client
    pub fn with_client(config: PollerConfig, client: Client) -> Self {
        let (latest, _) = watch::channel(None);

        Self {
            config,
            client: Mutex::new(client),
            latest,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Last snapshot produced, if any
    pub fn latest(&self) -> Option<DeviceSnapshot> {
        self.latest.borrow().clone()
    }

    /// Receiver notified on every new snapshot
    pub fn subscribe(&self) -> watch::Receiver<Option<DeviceSnapshot>> {
        self.latest.subscribe()
    }

    /// Run one polling cycle
    ///
    /// Fails only when the device cannot be reached or rejects the login.
    /// Unreadable outlets and sensors are reported as unknown instead.
    pub async fn refresh(&self) -> Result<DeviceSnapshot> {
        let mut client = self.client.lock().await;

        self.establish(&mut client).await?;

        if self.config.ping_on_refresh && !client.ping().await {
            debug!("Device did not answer client ping");
        }

        let count = self.outlet_count(&mut client).await?;

        let mut snapshot = DeviceSnapshot::new(false);

        for index in 1..=count {
            snapshot.outlets.insert(index, client.outlet(index).await);
        }

        if self.config.poll_sensors {
            for kind in SensorKind::ALL {
                snapshot.sensors.insert(kind, client.sensor(kind).await);
            }
        }

        snapshot.connected = client.is_connected();
        snapshot.taken_at = Utc::now();

        if !snapshot.connected {
            warn!("Connection lost during refresh, reconnecting next cycle");
        }

        debug!("Refreshed: {}", snapshot);
        self.latest.send_replace(Some(snapshot.clone()));

        Ok(snapshot)
    }

    /// Switch an outlet on or off
    ///
    /// On success the latest snapshot is updated without a refresh.
    pub async fn set_outlet_power(&self, index: u8, on: bool) -> bool {
        let mut client = self.client.lock().await;

        if let Err(e) = self.establish(&mut client).await {
            warn!("Cannot switch outlet {}: {}", index, e);
            return false;
        }

        if !client.set_outlet_state(index, on).await {
            warn!("Failed to turn outlet {} {}", index, if on { "on" } else { "off" });
            return false;
        }

        info!("Outlet {} turned {}", index, if on { "on" } else { "off" });

        self.latest.send_modify(|latest| {
            if let Some(snapshot) = latest {
                snapshot.set_outlet_state(index, on);
            }
        });

        true
    }

    /// Disconnect from the device
    pub async fn shutdown(&self) {
        self.client.lock().await.disconnect().await;
    }

    /// Poll every `poll_interval` on a background task
    ///
    /// Failed cycles are logged and retried on the next tick. Dropping the
    /// handle stops the task as well.
    pub fn spawn(self: Arc<Self>) -> PollerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let updates = self.subscribe();
        let poller = self;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poller.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!("Polling every {:?}", poller.config.poll_interval);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {}
                }

                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = poller.refresh() => {
                        if let Err(e) = result {
                            warn!("Refresh failed: {}", e);
                        }
                    }
                }
            }

            poller.shutdown().await;
            info!("Polling stopped");
        });

        PollerHandle {
            shutdown: Some(shutdown_tx),
            task,
            updates,
        }
    }

    /// Make sure the client is connected and logged in
    async fn establish(&self, client: &mut Client) -> Result<()> {
        if client.is_connected() && client.session().is_authenticated() {
            return Ok(());
        }

        let settings = &self.config.client;

        if !client.connect().await {
            client.disconnect().await;
            return Err(Error::UpdateFailed(format!(
                "cannot connect to {}",
                client.remote_addr()
            )));
        }

        if !client.login(&settings.username, &settings.password).await {
            client.disconnect().await;
            return Err(Error::UpdateFailed(format!(
                "login rejected for user {}",
                settings.username
            )));
        }

        Ok(())
    }

    /// Outlet count for this cycle
    ///
    /// A usable count is cached for the life of the poller. An unusable one
    /// triggers a single reconnect; if that does not help the default is used
    /// for this cycle only.
    async fn outlet_count(&self, client: &mut Client) -> Result<u8> {
        if let Some(count) = client.session().outlet_count() {
            return Ok(count);
        }

        if let Some(count) = self.query_outlet_count(client).await {
            return Ok(count);
        }

        warn!("Invalid outlet count, reconnecting once");
        client.disconnect().await;
        self.establish(client).await?;

        if let Some(count) = self.query_outlet_count(client).await {
            return Ok(count);
        }

        let count = self.config.default_outlet_count;
        warn!("Outlet count still invalid, assuming {}", count);
        Ok(count)
    }

    async fn query_outlet_count(&self, client: &mut Client) -> Option<u8> {
        match client.outlet_count().await {
            Some(count) if self.config.accepts_outlet_count(count) => {
                info!("Device reports {} outlets", count);
                client.session().cache_outlet_count(count);
                Some(count)
            }
            Some(count) => {
                warn!(
                    "Outlet count {} outside 1..={}",
                    count, self.config.max_outlets
                );
                None
            }
            None => None,
        }
    }
}

/// Handle to a running poll loop
pub struct PollerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    updates: watch::Receiver<Option<DeviceSnapshot>>,
}

impl PollerHandle {
    /// Receiver notified on every new snapshot
    pub fn updates(&self) -> watch::Receiver<Option<DeviceSnapshot>> {
        self.updates.clone()
    }

    /// Stop polling and disconnect
    ///
    /// A refresh in flight is abandoned.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Err(e) = (&mut self.task).await {
            warn!("Poll task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn config() -> PollerConfig {
        PollerConfig::new(ClientConfig::new("127.0.0.1", "password").with_port(1))
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let invalid = config().with_outlet_limits(0, 16);
        assert!(matches!(Poller::new(invalid), Err(Error::Types(_))));
    }

    #[test]
    fn test_no_snapshot_before_refresh() {
        let poller = Poller::new(config()).unwrap();
        assert!(poller.latest().is_none());
        assert!(poller.subscribe().borrow().is_none());
    }

    #[tokio::test]
    async fn test_set_outlet_power_unreachable() {
        let poller = Poller::new(config()).unwrap();
        assert!(!poller.set_outlet_power(1, true).await);
        assert!(poller.latest().is_none());
    }
}
