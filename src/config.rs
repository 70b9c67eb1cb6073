use crate::camera::{CaptureProfile, FrameSize};
use crate::retry::RetryPolicy;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

/// アプリケーション設定
///
/// この構造体はビルド時に`cfg.toml`ファイルから読み込まれた設定を保持します。
/// `cfg.toml` が無い場合は各フィールドのデフォルト値が使われます。
#[toml_cfg::toml_config]
pub struct Config {
    #[default("")]
    wifi_ssid: &'static str,
    #[default("")]
    wifi_password: &'static str,
    #[default("")]
    mqtt_host: &'static str,
    #[default(1884)]
    mqtt_port: u16,
    #[default("ESP32CAMClient")]
    mqtt_client_id: &'static str,
    #[default("")]
    mqtt_username: &'static str,
    #[default("")]
    mqtt_password: &'static str,
    #[default("cm/picture")]
    mqtt_topic: &'static str,
    #[default(15)]
    mqtt_keep_alive_secs: u64,
    #[default(5000)]
    mqtt_connect_timeout_ms: u32,
    #[default(2000)]
    mqtt_retry_delay_ms: u64,
    #[default(1000)]
    wifi_retry_delay_ms: u64,
    #[default(128)]
    max_chunk_size: usize,
    #[default(100)]
    chunk_delay_ms: u32,
    #[default(100)]
    min_image_size: u64,
    #[default(0)]
    capture_max_attempts: u32,
    #[default("/spiffs/image.jpg")]
    stage_path: &'static str,
    #[default("QVGA")]
    frame_size: &'static str,
    #[default(10)]
    jpeg_quality: u32,
    #[default(10)]
    tick_interval_ms: u32,
    #[default("inline")]
    pipeline_mode: &'static str,
    #[default(16384)]
    worker_stack_size: usize,
}

/// 設定エラー
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Wi-Fi の SSID が設定されていません")]
    MissingWifiSsid,

    #[error("MQTT ブローカーのホストが設定されていません")]
    MissingMqttHost,

    #[error("MQTT トピックが設定されていません")]
    MissingMqttTopic,

    #[error("チャンクサイズは 1 以上である必要があります")]
    InvalidChunkSize,

    #[error("ステージ画像のパスは絶対パスである必要があります: {0}")]
    InvalidStagePath(String),

    #[error("無効なパイプラインモード: {0}")]
    InvalidPipelineMode(String),

    #[error("無効なカメラ設定: {0}")]
    InvalidCamera(#[from] crate::camera::CameraError),
}

/// パイプラインの実行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// tick ループ内で同期的に実行する（撮影・送信中はループがブロックされる）
    Inline,
    /// 専用のワーカースレッドで実行する
    Worker,
}

impl FromStr for PipelineMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inline" => Ok(PipelineMode::Inline),
            "worker" => Ok(PipelineMode::Worker),
            _ => Err(ConfigError::InvalidPipelineMode(s.to_string())),
        }
    }
}

/// 検証済みのアプリケーション設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic: String,
    pub mqtt_keep_alive: Duration,
    pub mqtt_connect_timeout_ms: u32,
    pub mqtt_retry_delay: Duration,
    pub wifi_retry_delay: Duration,
    pub max_chunk_size: NonZeroUsize,
    pub chunk_delay_ms: u32,
    pub min_image_size: u64,
    pub capture_max_attempts: u32,
    pub stage_path: String,
    pub capture_profile: CaptureProfile,
    pub tick_interval_ms: u32,
    pub pipeline_mode: PipelineMode,
    pub worker_stack_size: usize,
}

/// 空文字列を `None` として扱います
fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl AppConfig {
    /// 設定ファイルから設定をロードします
    pub fn load() -> Result<Self, ConfigError> {
        // toml_cfg によって生成された定数
        let config = CONFIG;

        let max_chunk_size =
            NonZeroUsize::new(config.max_chunk_size).ok_or(ConfigError::InvalidChunkSize)?;
        let frame_size: FrameSize = config.frame_size.parse()?;
        let capture_profile = CaptureProfile::new(frame_size, config.jpeg_quality)?;

        let app_config = AppConfig {
            wifi_ssid: config.wifi_ssid.to_string(),
            wifi_password: config.wifi_password.to_string(),
            mqtt_host: config.mqtt_host.to_string(),
            mqtt_port: config.mqtt_port,
            mqtt_client_id: config.mqtt_client_id.to_string(),
            mqtt_username: optional(config.mqtt_username),
            mqtt_password: optional(config.mqtt_password),
            mqtt_topic: config.mqtt_topic.to_string(),
            mqtt_keep_alive: Duration::from_secs(config.mqtt_keep_alive_secs),
            mqtt_connect_timeout_ms: config.mqtt_connect_timeout_ms,
            mqtt_retry_delay: Duration::from_millis(config.mqtt_retry_delay_ms),
            wifi_retry_delay: Duration::from_millis(config.wifi_retry_delay_ms),
            max_chunk_size,
            chunk_delay_ms: config.chunk_delay_ms,
            min_image_size: config.min_image_size,
            capture_max_attempts: config.capture_max_attempts,
            stage_path: config.stage_path.to_string(),
            capture_profile,
            tick_interval_ms: config.tick_interval_ms,
            pipeline_mode: config.pipeline_mode.parse()?,
            worker_stack_size: config.worker_stack_size,
        };
        app_config.validate()?;
        Ok(app_config)
    }

    /// 設定値の整合性を確認します
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wifi_ssid.is_empty() {
            return Err(ConfigError::MissingWifiSsid);
        }
        if self.mqtt_host.is_empty() {
            return Err(ConfigError::MissingMqttHost);
        }
        if self.mqtt_topic.is_empty() {
            return Err(ConfigError::MissingMqttTopic);
        }
        if !self.stage_path.starts_with('/') {
            return Err(ConfigError::InvalidStagePath(self.stage_path.clone()));
        }
        Ok(())
    }

    /// MQTT ブローカーの URL
    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.mqtt_host, self.mqtt_port)
    }

    /// ステージ画像を置く SPIFFS のマウントポイント（例: `/spiffs`）
    pub fn storage_base_path(&self) -> &str {
        let rest = self.stage_path.get(1..).unwrap_or("");
        match rest.find('/') {
            Some(index) => &self.stage_path[..index + 1],
            None => "/",
        }
    }

    pub fn wifi_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::unbounded(self.wifi_retry_delay)
    }

    pub fn mqtt_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::unbounded(self.mqtt_retry_delay)
    }

    /// 画像検証失敗時の再撮影ポリシー（待機なし、0 回指定で無制限）
    pub fn capture_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::immediate().with_max_attempts(self.capture_max_attempts)
    }
}
