use super::{TransportError, TransportSession};
use crate::session::Session;
use embedded_svc::mqtt::client::{EventPayload, QoS};
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::mqtt::client::{EspMqttClient, MqttClientConfiguration};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 接続待ちのポーリング間隔
const CONNECT_POLL_MS: u32 = 50;

/// MQTT 接続設定
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub broker_url: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
    pub connect_timeout_ms: u32,
}

/// コールバックとメインループで共有する接続状態
#[derive(Debug, Default)]
struct ConnectionState {
    connected: AtomicBool,
    last_error: Mutex<Option<String>>,
}

/// ESP-IDF MQTT クライアントによるトランスポートセッション
///
/// esp-mqtt はキープアライブと自動再接続を内部タスクで処理するため、
/// 接続状態はイベントコールバックから更新されるフラグで追跡します。
pub struct MqttTransport {
    settings: MqttSettings,
    client: Option<EspMqttClient<'static>>,
    state: Arc<ConnectionState>,
    was_connected: bool,
}

impl MqttTransport {
    pub fn new(settings: MqttSettings) -> Self {
        Self {
            settings,
            client: None,
            state: Arc::new(ConnectionState::default()),
            was_connected: false,
        }
    }

    fn create_client(&self) -> Result<EspMqttClient<'static>, TransportError> {
        let conf = MqttClientConfiguration {
            client_id: Some(self.settings.client_id.as_str()),
            username: self.settings.username.as_deref(),
            password: self.settings.password.as_deref(),
            keep_alive_interval: Some(self.settings.keep_alive),
            ..Default::default()
        };

        let state = self.state.clone();
        EspMqttClient::new_cb(&self.settings.broker_url, &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => {
                    state.connected.store(true, Ordering::SeqCst);
                }
                EventPayload::Disconnected => {
                    state.connected.store(false, Ordering::SeqCst);
                }
                EventPayload::Error(e) => {
                    if let Ok(mut last_error) = state.last_error.lock() {
                        *last_error = Some(format!("{:?}", e));
                    }
                }
                _ => {}
            }
        })
        .map_err(|e| TransportError::InitFailed(format!("{:?}", e)))
    }
}

impl Session for MqttTransport {
    type Error = TransportError;

    fn name(&self) -> &'static str {
        "MQTT"
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.state.connected.load(Ordering::SeqCst)
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        if self.client.is_none() {
            info!(
                "MQTT クライアント '{}' を作成します ({})",
                self.settings.client_id, self.settings.broker_url
            );
            self.client = Some(self.create_client()?);
        }

        // クライアントは内部タスクで接続を進めるため、タイムアウトまで待機する
        let mut waited_ms = 0;
        while !self.state.connected.load(Ordering::SeqCst) {
            if waited_ms >= self.settings.connect_timeout_ms {
                return Err(TransportError::ConnectTimeout(
                    self.settings.connect_timeout_ms,
                ));
            }
            FreeRtos::delay_ms(CONNECT_POLL_MS);
            waited_ms += CONNECT_POLL_MS;
        }
        self.was_connected = true;
        Ok(())
    }
}

impl TransportSession for MqttTransport {
    fn pump(&mut self) {
        let connected = self.is_connected();
        if self.was_connected && !connected {
            warn!("MQTT 接続が切断されました");
        }
        self.was_connected = connected;

        let pending_error = self
            .state
            .last_error
            .lock()
            .ok()
            .and_then(|mut last_error| last_error.take());
        if let Some(e) = pending_error {
            error!("MQTT エラー: {}", e);
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        if !self.state.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;

        let message_id = client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(|e| TransportError::PublishFailed(format!("{:?}", e)))?;
        debug!("MQTT メッセージ {} を publish しました ({} バイト)", message_id, payload.len());
        Ok(())
    }
}
