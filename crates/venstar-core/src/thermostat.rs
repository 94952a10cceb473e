// ── Thermostat controller ──
//
// Full lifecycle management for one thermostat connection: session
// establishment, the recurring poll task, command routing, and the
// Online/Offline status surface. Exactly one poll task is alive at a
// time; connect() always tears down the previous session first.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use venstar_api::transport::TransportConfig;
use venstar_api::{ColorTouchClient, ControlRequest};

use crate::config::DeviceConfig;
use crate::error::CoreError;
use crate::model::{
    Channel, ChannelUpdate, ChannelValue, DeviceSnapshot, SystemMode, SystemState,
    TemperatureUnit,
};

const CHANNEL_UPDATE_BUFFER: usize = 64;

/// Sensor names the firmware assigns to the built-in and outdoor sensors.
const BUILTIN_SENSOR: &str = "Thermostat";
const OUTDOOR_SENSOR: &str = "Outdoor";

// ── ConnectionStatus ─────────────────────────────────────────────────

/// Connection status observable by the host.
///
/// Transitions only on poll/command success/failure and on disconnect.
/// Duplicate transitions are suppressed, so a run of successful polls
/// produces exactly one Online event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Online,
    Offline {
        reason: OfflineReason,
        message: String,
    },
}

/// Why the device is offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineReason {
    /// No session -- not yet connected, or deliberately disconnected.
    Disconnected,
    /// Transient transport/protocol failure; the next tick retries.
    CommunicationError,
    /// Bad credentials or invalid configuration; user action required.
    ConfigurationError,
}

// ── Thermostat ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc`. Owns the session (HTTP client plus the
/// recurring poll task), the last-known snapshot, and the status surface.
#[derive(Clone)]
pub struct Thermostat {
    inner: Arc<ThermostatInner>,
}

struct ThermostatInner {
    config: Mutex<DeviceConfig>,
    /// Snapshot and active unit. One mutex serializes every
    /// read-modify-write between the poll task and command handlers.
    state: Mutex<DeviceState>,
    status_tx: watch::Sender<ConnectionStatus>,
    update_tx: broadcast::Sender<ChannelUpdate>,
    session: Mutex<Option<Session>>,
}

struct DeviceState {
    snapshot: Option<DeviceSnapshot>,
    unit: TemperatureUnit,
}

struct Session {
    client: Arc<ColorTouchClient>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Thermostat {
    /// Create a new instance from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to start the poll task.
    pub fn new(config: DeviceConfig) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Offline {
            reason: OfflineReason::Disconnected,
            message: "not connected".into(),
        });
        let (update_tx, _) = broadcast::channel(CHANNEL_UPDATE_BUFFER);

        Self {
            inner: Arc::new(ThermostatInner {
                config: Mutex::new(config),
                state: Mutex::new(DeviceState {
                    snapshot: None,
                    // Most of these devices ship configured for the US;
                    // the real unit arrives with the first info payload.
                    unit: TemperatureUnit::Fahrenheit,
                }),
                status_tx,
                update_tx,
                session: Mutex::new(None),
            }),
        }
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Connect to the device.
    ///
    /// Tears down any existing session first (an active session is never
    /// mutated), validates the config, builds a fresh HTTP client with
    /// fresh digest credential state, and spawns the recurring poll task.
    /// The first poll fires immediately.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.disconnect().await;

        let config = self.inner.config.lock().await.clone();
        config.validate()?;

        let transport = TransportConfig {
            timeout: config.timeout,
            ..TransportConfig::default()
        };
        let client = Arc::new(ColorTouchClient::new(
            config.base_url.clone(),
            config.username.clone(),
            config.password.clone(),
            &transport,
        )?);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_task(
            self.clone(),
            Arc::clone(&client),
            config.refresh_interval,
            cancel.clone(),
        ));
        *self.inner.session.lock().await = Some(Session {
            client,
            cancel,
            handle,
        });

        info!(url = %config.base_url, "connected to thermostat");
        Ok(())
    }

    /// Disconnect from the device.
    ///
    /// Cancels the poll task deterministically (awaiting its completion),
    /// drops the HTTP client and its digest credential state, and resets
    /// the status to Offline.
    pub async fn disconnect(&self) {
        let session = self.inner.session.lock().await.take();
        if let Some(session) = session {
            session.cancel.cancel();
            let _ = session.handle.await;
            debug!("poll task stopped");
        }
        self.set_status(ConnectionStatus::Offline {
            reason: OfflineReason::Disconnected,
            message: "disconnected".into(),
        });
    }

    /// Replace the configuration wholesale and reconnect.
    ///
    /// Calling this repeatedly is safe: each call fully disconnects before
    /// starting a new session, so only the last poll task survives.
    pub async fn reconnect(&self, config: DeviceConfig) -> Result<(), CoreError> {
        *self.inner.config.lock().await = config;
        self.connect().await
    }

    /// Run one poll cycle immediately (host-initiated refresh).
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let client = self.client().await?;
        self.poll_once(&client).await
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Set the heating setpoint, in the device's active unit.
    pub async fn set_heating_setpoint(&self, value: f64) -> Result<(), CoreError> {
        self.push_control(Some(value), None, None).await
    }

    /// Set the cooling setpoint, in the device's active unit.
    pub async fn set_cooling_setpoint(&self, value: f64) -> Result<(), CoreError> {
        self.push_control(None, Some(value), None).await
    }

    /// Set the system mode.
    pub async fn set_system_mode(&self, mode: SystemMode) -> Result<(), CoreError> {
        self.push_control(None, None, Some(mode)).await
    }

    // ── State observation ────────────────────────────────────────────

    /// Subscribe to connection status changes.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// The current connection status.
    pub fn current_status(&self) -> ConnectionStatus {
        self.inner.status_tx.borrow().clone()
    }

    /// Subscribe to published channel values.
    pub fn updates(&self) -> broadcast::Receiver<ChannelUpdate> {
        self.inner.update_tx.subscribe()
    }

    /// The last-known device snapshot, if a poll has succeeded.
    pub async fn snapshot(&self) -> Option<DeviceSnapshot> {
        self.inner.state.lock().await.snapshot.clone()
    }

    /// The currently active temperature unit.
    pub async fn temperature_unit(&self) -> TemperatureUnit {
        self.inner.state.lock().await.unit
    }

    /// How long ago the last successful poll completed.
    pub async fn data_age(&self) -> Option<chrono::Duration> {
        self.inner
            .state
            .lock()
            .await
            .snapshot
            .as_ref()
            .map(|s| Utc::now() - s.received_at)
    }

    // ── Poll cycle ───────────────────────────────────────────────────

    pub(crate) async fn poll_once(&self, client: &ColorTouchClient) -> Result<(), CoreError> {
        match self.apply_poll(client).await {
            Ok(()) => {
                self.set_status(ConnectionStatus::Online);
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "poll cycle failed");
                self.set_status(offline_status(&e));
                Err(e)
            }
        }
    }

    /// Fetch both payloads, then swap in the new snapshot atomically.
    ///
    /// Any failure before the swap leaves the previous snapshot in place:
    /// stale data is never presented as fresh, but never blanked either.
    async fn apply_poll(&self, client: &ColorTouchClient) -> Result<(), CoreError> {
        let sensors = client.sensors().await?;
        let info = client.info().await?;

        let system_state = SystemState::from_code(info.state)?;
        let system_mode = SystemMode::from_code(info.mode)?;

        let mut state = self.inner.state.lock().await;
        match TemperatureUnit::from_code(info.tempunits) {
            Ok(unit) => state.unit = unit,
            // The device keeps working in whatever unit it had; so do we.
            Err(e) => warn!(error = %e, "keeping previous unit {}", state.unit),
        }
        let unit = state.unit;

        let builtin = sensors.named(BUILTIN_SENSOR);
        let snapshot = DeviceSnapshot {
            temperature: builtin.and_then(|s| s.temp),
            outdoor_temperature: sensors.named(OUTDOOR_SENSOR).and_then(|s| s.temp),
            humidity: builtin.and_then(|s| s.hum),
            heat_setpoint: info.heattemp,
            cool_setpoint: info.cooltemp,
            system_state,
            system_mode,
            unit,
            received_at: Utc::now(),
        };

        self.publish_snapshot(&snapshot);
        state.snapshot = Some(snapshot);
        Ok(())
    }

    fn publish_snapshot(&self, snapshot: &DeviceSnapshot) {
        let unit = snapshot.unit;
        if let Some(value) = snapshot.temperature {
            self.publish(Channel::Temperature, ChannelValue::Temperature { value, unit });
        }
        if let Some(value) = snapshot.outdoor_temperature {
            self.publish(
                Channel::OutdoorTemperature,
                ChannelValue::Temperature { value, unit },
            );
        }
        if let Some(value) = snapshot.humidity {
            self.publish(Channel::Humidity, ChannelValue::Percent(value));
        }
        self.publish(
            Channel::HeatingSetpoint,
            ChannelValue::Temperature { value: snapshot.heat_setpoint, unit },
        );
        self.publish(
            Channel::CoolingSetpoint,
            ChannelValue::Temperature { value: snapshot.cool_setpoint, unit },
        );
        self.publish(
            Channel::SystemState,
            ChannelValue::SystemState(snapshot.system_state),
        );
        self.publish(
            Channel::SystemMode,
            ChannelValue::SystemMode(snapshot.system_mode),
        );
    }

    fn publish(&self, channel: Channel, value: ChannelValue) {
        let _ = self.inner.update_tx.send(ChannelUpdate { channel, value });
    }

    // ── Command plumbing ─────────────────────────────────────────────

    /// Compose and push the full desired state (heat, cool, mode).
    ///
    /// The device's control endpoint resets any omitted dimension, so the
    /// two dimensions not being changed are filled from the last-known
    /// snapshot. On success the local snapshot is updated optimistically;
    /// on failure it is left untouched and the status degrades exactly as
    /// a failed poll would (no reconnect, no reschedule -- the next
    /// periodic tick recovers).
    async fn push_control(
        &self,
        heat: Option<f64>,
        cool: Option<f64>,
        mode: Option<SystemMode>,
    ) -> Result<(), CoreError> {
        let client = self.client().await?;

        // Held across the request: the merge and the optimistic write must
        // not interleave with a poll applying a newer snapshot.
        let mut state = self.inner.state.lock().await;
        let unit = state.unit;
        let Some(snapshot) = state.snapshot.as_mut() else {
            return Err(CoreError::NotSynchronized);
        };

        let heattemp = heat.map_or(snapshot.heat_setpoint, |v| unit.round_setpoint(v));
        let cooltemp = cool.map_or(snapshot.cool_setpoint, |v| unit.round_setpoint(v));
        let target_mode = mode.unwrap_or(snapshot.system_mode);

        debug!(heattemp, cooltemp, mode = %target_mode, "updating thermostat");
        let request = ControlRequest {
            heattemp,
            cooltemp,
            mode: target_mode.code(),
        };

        match client.control(&request).await {
            Ok(()) => {
                snapshot.heat_setpoint = heattemp;
                snapshot.cool_setpoint = cooltemp;
                snapshot.system_mode = target_mode;
                self.publish(
                    Channel::HeatingSetpoint,
                    ChannelValue::Temperature { value: heattemp, unit },
                );
                self.publish(
                    Channel::CoolingSetpoint,
                    ChannelValue::Temperature { value: cooltemp, unit },
                );
                self.publish(Channel::SystemMode, ChannelValue::SystemMode(target_mode));
                Ok(())
            }
            Err(e) => {
                let core = CoreError::from(e);
                debug!(error = %core, "thermostat update failed");
                self.set_status(offline_status(&core));
                Err(core)
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    async fn client(&self) -> Result<Arc<ColorTouchClient>, CoreError> {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| Arc::clone(&s.client))
            .ok_or(CoreError::Disconnected)
    }

    /// Set the status, suppressing duplicate transitions.
    fn set_status(&self, next: ConnectionStatus) {
        self.inner.status_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(status = ?next, "connection status changed");
            *current = next;
            true
        });
    }
}

// ── Background task ──────────────────────────────────────────────────

/// Recurring poll loop. The tick body runs to completion before the next
/// firing; missed ticks delay instead of bursting, so poll cycles never
/// overlap.
async fn poll_task(
    thermostat: Thermostat,
    client: Arc<ColorTouchClient>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = thermostat.poll_once(&client).await {
                    warn!(error = %e, "periodic poll failed");
                }
            }
        }
    }
}

/// Classify a failure into the Offline detail the host sees.
fn offline_status(err: &CoreError) -> ConnectionStatus {
    let reason = match err {
        CoreError::AuthenticationFailed { .. } | CoreError::Config { .. } => {
            OfflineReason::ConfigurationError
        }
        CoreError::CommunicationFailed { .. }
        | CoreError::Disconnected
        | CoreError::NotSynchronized => OfflineReason::CommunicationError,
    };
    ConnectionStatus::Offline {
        reason,
        message: err.to_string(),
    }
}
