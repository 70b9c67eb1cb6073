/// ESP-IDF Wi-Fi ステーションによるリンク実装
#[cfg(target_os = "espidf")]
pub mod wifi;

#[cfg(target_os = "espidf")]
pub use wifi::WifiLink;

use crate::session::Session;

/// ネットワークリンクのエラー
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Wi-Fi 認証情報が不正です: {0}")]
    InvalidCredentials(String),

    #[error("Wi-Fi の設定に失敗しました: {0}")]
    ConfigurationFailed(String),

    #[error("Wi-Fi への接続に失敗しました: {0}")]
    ConnectFailed(String),
}

/// トランスポートの下位にあるネットワークリンクのセッション
pub trait LinkSession: Session<Error = LinkError> {}

impl<T: Session<Error = LinkError>> LinkSession for T {}
