/// ESP-IDF MQTT クライアントによるトランスポート実装
#[cfg(target_os = "espidf")]
pub mod mqtt;

#[cfg(target_os = "espidf")]
pub use mqtt::{MqttSettings, MqttTransport};

use crate::session::Session;
use std::sync::{Arc, Mutex};

/// トランスポート層のエラー
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("MQTT クライアントの初期化に失敗しました: {0}")]
    InitFailed(String),

    #[error("ブローカーへの接続がタイムアウトしました ({0} ms)")]
    ConnectTimeout(u32),

    #[error("ブローカーに接続されていません")]
    NotConnected,

    #[error("publish に失敗しました: {0}")]
    PublishFailed(String),

    #[error("トランスポートのロック取得に失敗しました")]
    LockPoisoned,
}

/// publish/subscribe トランスポートのセッション
///
/// `publish` は 1 回だけ送信を試み、内部でリトライしません。
pub trait TransportSession: Session<Error = TransportError> {
    /// キープアライブやプロトコルの定期処理を 1 tick 分実行します
    fn pump(&mut self);

    /// `payload` を `topic` に 1 回だけ送信します
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;
}

/// スレッド間で共有されるトランスポート
///
/// tick ループとパイプラインワーカーが同じセッションを使う場合に、
/// 各呼び出しをミューテックスで排他します。
pub type SharedTransport<T> = Arc<Mutex<T>>;

/// トランスポートを共有可能な形に包みます
pub fn shared<T: TransportSession>(transport: T) -> SharedTransport<T> {
    Arc::new(Mutex::new(transport))
}

impl<T: TransportSession> Session for Arc<Mutex<T>> {
    type Error = TransportError;

    fn name(&self) -> &'static str {
        match self.lock() {
            Ok(guard) => guard.name(),
            Err(_) => "transport",
        }
    }

    fn is_connected(&self) -> bool {
        self.lock().map(|guard| guard.is_connected()).unwrap_or(false)
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        self.lock()
            .map_err(|_| TransportError::LockPoisoned)?
            .connect()
    }
}

impl<T: TransportSession> TransportSession for Arc<Mutex<T>> {
    fn pump(&mut self) {
        if let Ok(mut guard) = self.lock() {
            guard.pump();
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.lock()
            .map_err(|_| TransportError::LockPoisoned)?
            .publish(topic, payload)
    }
}
