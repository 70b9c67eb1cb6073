/*!
 * # ESP Camera MQTT Library
 *
 * ボタン押下で ESP32 カメラ画像を撮影し、MQTT ブローカーへ分割送信するためのライブラリ
 *
 * このライブラリは以下の主要な機能を提供します：
 * - カメラ制御と画像キャプチャ
 * - SPIFFS への画像ステージングとサイズ検証
 * - MQTT ペイロードサイズに合わせた画像の分割送信
 * - Wi-Fi / MQTT セッションの再接続
 * - ボタン入力のエッジ検出と tick ループ
 * - 設定管理
 */

// 公開モジュール
pub mod camera;
pub mod capture;
pub mod config;
pub mod delay;
pub mod fragmenter;
pub mod link;
pub mod pipeline;
pub mod retry;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod transport;
pub mod trigger;
pub mod worker;

#[cfg(test)]
mod test_support;

// 内部で使用する型をまとめてエクスポート
pub use camera::{CameraError, CaptureProfile, FrameSize};
pub use capture::CaptureSource;
pub use config::{AppConfig, ConfigError, PipelineMode};
pub use delay::{Delay, StdDelay};
pub use fragmenter::{Fragmenter, TransmitReport};
pub use link::{LinkError, LinkSession};
pub use pipeline::{CapturePipeline, PipelineError, PipelineReport};
pub use retry::RetryPolicy;
pub use scheduler::{InlinePipeline, TickLoop, TickOutcome, TriggerHandler};
pub use session::{ensure_connected, Session, SessionError};
pub use storage::{FileStageStore, StageStore, StorageError};
pub use transport::{shared, SharedTransport, TransportError, TransportSession};
pub use trigger::{TriggerEdge, TriggerInput, TriggerMonitor, TriggerState};
pub use worker::{PipelineWorker, WorkerError};

#[cfg(target_os = "espidf")]
pub use camera::{AiThinkerPins, CameraController};
#[cfg(target_os = "espidf")]
pub use delay::FreeRtosDelay;
#[cfg(target_os = "espidf")]
pub use link::WifiLink;
#[cfg(target_os = "espidf")]
pub use storage::mount_spiffs;
#[cfg(target_os = "espidf")]
pub use transport::{MqttSettings, MqttTransport};
#[cfg(target_os = "espidf")]
pub use trigger::ButtonInput;

/// ライブラリのバージョン情報
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
