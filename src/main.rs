// MIT License - Copyright (c) 2026 Peter Wright
// MQTT bridge

use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use tuxedo_bridge::{
    BridgeEvent, BridgeSnapshot, EventReceiver, PanelConfig, Scheme, TargetState, TuxedoBridge,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "tuxedo2mqtt")]
#[command(about = "Bridge between a Honeywell Tuxedo Touch panel and MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    panel: PanelToml,
    mqtt: MqttToml,
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    #[serde(default = "default_panel_name")]
    name: String,
    host: String,
    /// Omitted: the scheme's default port
    #[serde(default)]
    port: Option<u16>,
    #[serde(default = "default_scheme")]
    scheme: String,
    #[serde(default)]
    alarm_code: String,
    #[serde(default = "default_polling")]
    polling: bool,
    #[serde(default = "default_poll_interval")]
    poll_interval_ms: u64,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    refresh_before_command: bool,
    #[serde(default = "default_keepalive_interval")]
    keepalive_interval_ms: u64,
    #[serde(default = "default_request_timeout")]
    request_timeout_ms: u64,
}

fn default_panel_name() -> String {
    "Honeywell Security".to_string()
}
fn default_scheme() -> String {
    "http".to_string()
}
fn default_polling() -> bool {
    true
}
fn default_poll_interval() -> u64 {
    30000
}
fn default_keepalive_interval() -> u64 {
    90000
}
fn default_request_timeout() -> u64 {
    10000
}

#[derive(Debug, Deserialize)]
struct MqttToml {
    url: String,
    #[serde(default = "default_client_id")]
    client_id: String,
    #[serde(default = "default_subscribe_topic")]
    subscribe_topic: String,
    #[serde(default = "default_publish_topic")]
    publish_topic: String,
    #[serde(default = "default_snapshot_interval")]
    snapshot_interval_secs: u64,
}

fn default_client_id() -> String {
    "tuxedo-bridge".to_string()
}
fn default_subscribe_topic() -> String {
    "tuxedo/cmd".to_string()
}
fn default_publish_topic() -> String {
    "tuxedo".to_string()
}
fn default_snapshot_interval() -> u64 {
    60
}

/// One run's worth of validated settings, rebuilt on every SIGHUP.
struct Settings {
    panel: PanelConfig,
    mqtt_host: String,
    mqtt_port: u16,
    client_id: String,
    publish_topic: String,
    subscribe_topic: String,
    snapshot_every: Duration,
}

impl Settings {
    fn load(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        let config: Config = toml::from_str(&text).context("Failed to parse config file")?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self> {
        let panel = build_panel_config(&config.panel)?;
        let (mqtt_host, mqtt_port) = parse_mqtt_url(&config.mqtt.url)?;
        // tokio intervals panic on a zero period
        let snapshot_secs = NonZeroU64::new(config.mqtt.snapshot_interval_secs)
            .context("mqtt.snapshot_interval_secs must be at least 1")?;
        Ok(Self {
            panel,
            mqtt_host,
            mqtt_port,
            client_id: config.mqtt.client_id,
            publish_topic: config.mqtt.publish_topic,
            subscribe_topic: config.mqtt.subscribe_topic,
            snapshot_every: Duration::from_secs(snapshot_secs.get()),
        })
    }
}

fn build_panel_config(toml: &PanelToml) -> Result<PanelConfig> {
    let scheme = Scheme::from_name(&toml.scheme)
        .with_context(|| format!("Unknown scheme: {}", toml.scheme))?;
    let config = PanelConfig::builder()
        .name(&toml.name)
        .host(&toml.host)
        .port(toml.port)
        .scheme(scheme)
        .alarm_code(&toml.alarm_code)
        .polling(toml.polling)
        .poll_interval_ms(toml.poll_interval_ms)
        .debug(toml.debug)
        .refresh_before_command(toml.refresh_before_command)
        .keepalive_interval_ms(toml.keepalive_interval_ms)
        .request_timeout_ms(toml.request_timeout_ms)
        .build();
    config.validate().context("Invalid [panel] config")?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// MQTT JSON types
// ---------------------------------------------------------------------------

/// Every published message is flat: `{now, op, ...body}`.
#[derive(Serialize)]
struct Message<T> {
    now: u64,
    op: &'static str,
    #[serde(flatten)]
    body: T,
}

impl<T> Message<T> {
    fn new(op: &'static str, body: T) -> Self {
        Self {
            now: Utc::now().timestamp_millis() as u64,
            op,
            body,
        }
    }
}

#[derive(Serialize)]
struct StateBody {
    state: &'static str,
}

#[derive(Serialize)]
struct FaultBody {
    fault: bool,
}

#[derive(Serialize)]
struct EntryDelayBody {
    active: bool,
}

#[derive(Serialize)]
struct SnapshotBody {
    state: SnapshotState,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotState {
    current: &'static str,
    target: &'static str,
    fault: bool,
    entry_delay: bool,
}

impl From<BridgeSnapshot> for SnapshotBody {
    fn from(snapshot: BridgeSnapshot) -> Self {
        Self {
            state: SnapshotState {
                current: snapshot.current.as_str(),
                target: snapshot.target.as_str(),
                fault: snapshot.fault,
                entry_delay: snapshot.entry_delay,
            },
        }
    }
}

#[derive(Serialize)]
struct AckBody {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    src: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct MqttCommand {
    op: String,
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

/// MQTT client paired with the topic all bridge output goes to.
#[derive(Clone)]
struct Publisher {
    client: AsyncClient,
    topic: Arc<str>,
}

impl Publisher {
    async fn publish<T: Serialize>(&self, msg: &Message<T>, retain: bool) {
        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {} message: {e}", msg.op);
                return;
            }
        };
        if let Err(e) = self.client.publish(&*self.topic, QoS::AtLeastOnce, retain, json).await {
            error!("Failed to publish {} to {}: {e}", msg.op, self.topic);
        }
    }

    /// Publish the retained snapshot and hand it back for use in a `CMD_ACK`.
    async fn snapshot(&self, bridge: &TuxedoBridge) -> Message<SnapshotBody> {
        let msg = Message::new("SNAPSHOT", SnapshotBody::from(bridge.snapshot().await));
        self.publish(&msg, true).await;
        msg
    }

    async fn ack(&self, success: bool, src: Option<serde_json::Value>, data: Option<serde_json::Value>) {
        let msg = Message::new("CMD_ACK", AckBody { success, src, data });
        self.publish(&msg, false).await;
    }
}

async fn forward_event(event: BridgeEvent, out: &Publisher) {
    match event {
        BridgeEvent::CurrentStateChanged(state) => {
            info!("Current state: {state}");
            let msg = Message::new("CURRENT_STATE", StateBody { state: state.as_str() });
            out.publish(&msg, false).await;
        }
        BridgeEvent::TargetStateChanged(state) => {
            info!("Target state: {state}");
            let msg = Message::new("TARGET_STATE", StateBody { state: state.as_str() });
            out.publish(&msg, false).await;
        }
        BridgeEvent::FaultChanged(fault) => {
            out.publish(&Message::new("FAULT", FaultBody { fault }), false).await;
        }
        BridgeEvent::EntryDelayChanged(active) => {
            info!("Entry delay {}", if active { "started" } else { "ended" });
            out.publish(&Message::new("ENTRY_DELAY", EntryDelayBody { active }), false)
                .await;
        }
        BridgeEvent::PollFailed { property, reason } => {
            warn!("Polling {property} failed: {reason}");
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Action {
    Snapshot,
    Ping,
    SetTarget(TargetState),
}

impl Action {
    fn from_op(op: &str) -> Option<Self> {
        let action = match op {
            "SNAPSHOT" => Action::Snapshot,
            "PING" => Action::Ping,
            "ARM_STAY" => Action::SetTarget(TargetState::StayArmed),
            "ARM_AWAY" => Action::SetTarget(TargetState::AwayArmed),
            "ARM_NIGHT" => Action::SetTarget(TargetState::NightArmed),
            "DISARM" => Action::SetTarget(TargetState::Ready),
            _ => return None,
        };
        Some(action)
    }
}

async fn run_command(payload: &str, out: &Publisher, bridge: &TuxedoBridge) {
    let op = match serde_json::from_str::<MqttCommand>(payload) {
        Ok(cmd) => cmd.op,
        Err(e) => {
            warn!("Ignoring malformed MQTT command {payload:?}: {e}");
            return;
        }
    };
    // The ack echoes the command back as `src`
    let src = serde_json::from_str::<serde_json::Value>(payload).ok();

    match Action::from_op(&op) {
        Some(Action::Snapshot) => {
            debug!("Command: SNAPSHOT");
            let snapshot = out.snapshot(bridge).await;
            out.ack(true, src, serde_json::to_value(&snapshot).ok()).await;
        }
        Some(Action::Ping) => {
            info!("Command: PING");
            out.ack(true, src, None).await;
        }
        Some(Action::SetTarget(target)) => {
            info!("Command: {op} (target {target})");
            let result = bridge.send_target_state(target).await;
            if let Err(e) = &result {
                error!("{op} failed: {e}");
            }
            out.ack(result.is_ok(), src, None).await;
        }
        None => {
            warn!("Unknown command: {op}");
            out.ack(false, src, None).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

fn spawn_event_forwarder(mut events: EventReceiver, out: Publisher) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => forward_event(event, &out).await,
                Err(RecvError::Lagged(n)) => warn!("Dropped {n} bridge events"),
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Bridge event stream closed");
    })
}

fn spawn_command_loop(
    mut eventloop: EventLoop,
    out: Publisher,
    command_topic: String,
    bridge: Arc<TuxedoBridge>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                // Subscriptions are lost whenever the broker connection drops
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("MQTT: connected, subscribing to {command_topic}");
                    if let Err(e) = out.client.subscribe(&command_topic, QoS::AtLeastOnce).await {
                        error!("Failed to subscribe to {command_topic}: {e}");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(msg))) if msg.topic == command_topic => {
                    let payload = String::from_utf8_lossy(&msg.payload);
                    debug!("MQTT command received: {payload}");
                    run_command(&payload, &out, &bridge).await;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT connection error: {e}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    })
}

/// Republish the snapshot every `every`, starting one period from now.
fn spawn_snapshot_timer(bridge: Arc<TuxedoBridge>, out: Publisher, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        loop {
            ticker.tick().await;
            out.snapshot(&bridge).await;
        }
    })
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_logging(default_level: &str) {
    // RUST_LOG overrides the configured level, e.g. RUST_LOG=tuxedo_bridge=trace
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // journald stamps each line itself
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

/// Returns true when the signal asks for a config reload.
async fn wait_for_signal(sighup: &mut Signal, sigterm: &mut Signal) -> bool {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("SIGINT received, stopping");
            false
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received, stopping");
            false
        }
        _ = sighup.recv() => {
            info!("SIGHUP received, reloading");
            true
        }
    }
}

/// Bridge the panel to MQTT until a signal arrives, then tear everything
/// down. Returns whether to reload and go again.
async fn run(settings: &Settings, sighup: &mut Signal, sigterm: &mut Signal) -> Result<bool> {
    info!("Starting bridge for panel at {}", settings.panel.base_url());
    let bridge = Arc::new(TuxedoBridge::start(settings.panel.clone()).await?);

    let mut options = MqttOptions::new(&settings.client_id, &settings.mqtt_host, settings.mqtt_port);
    options.set_keep_alive(Duration::from_secs(30));
    let (client, eventloop) = AsyncClient::new(options, 256);
    client
        .subscribe(&settings.subscribe_topic, QoS::AtLeastOnce)
        .await
        .context("Failed to subscribe to MQTT topic")?;

    let out = Publisher {
        client: client.clone(),
        topic: settings.publish_topic.as_str().into(),
    };
    out.snapshot(&bridge).await;

    let tasks = [
        spawn_event_forwarder(bridge.subscribe(), out.clone()),
        spawn_command_loop(
            eventloop,
            out.clone(),
            settings.subscribe_topic.clone(),
            Arc::clone(&bridge),
        ),
        spawn_snapshot_timer(Arc::clone(&bridge), out, settings.snapshot_every),
    ];
    info!(
        "Publishing to {}, commands on {}",
        settings.publish_topic, settings.subscribe_topic
    );

    let reload = wait_for_signal(sighup, sigterm).await;

    for task in tasks {
        task.abort();
        let _ = task.await;
    }
    if let Err(e) = client.disconnect().await {
        debug!("MQTT disconnect: {e}");
    }
    match Arc::into_inner(bridge) {
        Some(mut bridge) => bridge.shutdown(),
        None => warn!("Bridge still referenced at shutdown; its tasks stop when dropped"),
    }
    Ok(reload)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)?;
    init_logging(settings.panel.log_level());

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    while run(&settings, &mut sighup, &mut sigterm).await? {
        match Settings::load(&cli.config) {
            Ok(reloaded) => {
                settings = reloaded;
                info!("Reloaded {}", cli.config);
            }
            Err(e) => warn!("Reload of {} failed, keeping previous config: {e:#}", cli.config),
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Split `mqtt://host:port` (or `tcp://`, or a bare `host:port`) into host and port.
fn parse_mqtt_url(url: &str) -> Result<(String, u16)> {
    let authority = match url.split_once("://") {
        Some(("mqtt" | "tcp", rest)) => rest,
        Some((scheme, _)) => anyhow::bail!("Unsupported MQTT URL scheme: {scheme}"),
        None => url,
    };
    let (host, port) = authority
        .rsplit_once(':')
        .with_context(|| format!("MQTT URL has no port: {url}"))?;
    let port = port
        .parse()
        .with_context(|| format!("Invalid MQTT port in {url}"))?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuxedo_bridge::NormalizedState;

    fn settings(toml: &str) -> Result<Settings> {
        Settings::from_config(toml::from_str(toml)?)
    }

    #[test]
    fn test_parse_mqtt_url() {
        assert_eq!(parse_mqtt_url("mqtt://broker:1883").unwrap(), ("broker".to_string(), 1883));
        assert_eq!(parse_mqtt_url("tcp://10.0.0.2:8883").unwrap(), ("10.0.0.2".to_string(), 8883));
        assert_eq!(parse_mqtt_url("broker:1884").unwrap(), ("broker".to_string(), 1884));
        assert!(parse_mqtt_url("mqtt://broker").is_err());
        assert!(parse_mqtt_url("ws://broker:80").is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = toml::from_str(
            r#"
            [panel]
            host = "192.168.1.50"

            [mqtt]
            url = "mqtt://localhost:1883"
            "#,
        )
        .unwrap();
        assert_eq!(config.panel.name, "Honeywell Security");
        assert!(config.panel.polling);
        assert_eq!(config.panel.poll_interval_ms, 30000);

        let settings = Settings::from_config(config).unwrap();
        assert_eq!(settings.panel.base_url(), "http://192.168.1.50");
        assert_eq!(settings.panel.log_level(), "info");
        assert_eq!((settings.mqtt_host.as_str(), settings.mqtt_port), ("localhost", 1883));
        assert_eq!(settings.publish_topic, "tuxedo");
        assert_eq!(settings.subscribe_topic, "tuxedo/cmd");
        assert_eq!(settings.snapshot_every, Duration::from_secs(60));
    }

    #[test]
    fn test_debug_flag_raises_log_level() {
        let settings = settings(
            r#"
            [panel]
            host = "panel.local"
            debug = true

            [mqtt]
            url = "mqtt://localhost:1883"
            "#,
        )
        .unwrap();
        assert_eq!(settings.panel.log_level(), "debug");
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let result = settings(
            r#"
            [panel]
            host = "panel.local"
            scheme = "ftp"

            [mqtt]
            url = "mqtt://localhost:1883"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_snapshot_interval_rejected() {
        let err = settings(
            r#"
            [panel]
            host = "panel.local"

            [mqtt]
            url = "mqtt://localhost:1883"
            snapshot_interval_secs = 0
            "#,
        )
        .err()
        .expect("zero snapshot interval accepted");
        assert!(format!("{err:#}").contains("snapshot_interval_secs"));
    }

    #[test]
    fn test_zero_poll_interval_rejected_at_load() {
        let result = settings(
            r#"
            [panel]
            host = "panel.local"
            poll_interval_ms = 0

            [mqtt]
            url = "mqtt://localhost:1883"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_command_actions() {
        assert_eq!(Action::from_op("SNAPSHOT"), Some(Action::Snapshot));
        assert_eq!(Action::from_op("PING"), Some(Action::Ping));
        assert_eq!(Action::from_op("ARM_STAY"), Some(Action::SetTarget(TargetState::StayArmed)));
        assert_eq!(Action::from_op("ARM_AWAY"), Some(Action::SetTarget(TargetState::AwayArmed)));
        assert_eq!(Action::from_op("ARM_NIGHT"), Some(Action::SetTarget(TargetState::NightArmed)));
        assert_eq!(Action::from_op("DISARM"), Some(Action::SetTarget(TargetState::Ready)));
        assert_eq!(Action::from_op("ARM_GROUP"), None);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let snapshot = Message::new(
            "SNAPSHOT",
            SnapshotBody::from(BridgeSnapshot {
                current: NormalizedState::Triggered,
                target: TargetState::AwayArmed,
                fault: false,
                entry_delay: true,
            }),
        );
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value["now"].is_u64());
        assert_eq!(value["op"], "SNAPSHOT");
        assert_eq!(value["state"]["current"], "triggered");
        assert_eq!(value["state"]["target"], "awayArmed");
        assert_eq!(value["state"]["entryDelay"], true);
    }

    #[test]
    fn test_ack_omits_missing_fields() {
        let ack = Message::new("CMD_ACK", AckBody { success: false, src: None, data: None });
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value["op"], "CMD_ACK");
        assert_eq!(value["success"], false);
        assert!(value.get("src").is_none());
        assert!(value.get("data").is_none());
    }
}
