/// esp32-camera コンポーネントの安全なラッパー
#[cfg(target_os = "espidf")]
pub mod driver;

/// ESP32-CAM (AI-Thinker) 向けカメラコントローラー
#[cfg(target_os = "espidf")]
pub mod controller;

#[cfg(target_os = "espidf")]
pub use controller::{AiThinkerPins, CameraController};

use log::warn;
use std::str::FromStr;

/// カメラ制御に関するエラー
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("カメラの初期化に失敗しました: {0}")]
    InitFailed(String),

    #[error("画像キャプチャに失敗しました")]
    CaptureFailed,

    #[error("無効なフレームサイズです: {0}")]
    UnknownFrameSize(String),

    #[error("JPEG 品質は 0〜63 で指定してください: {0}")]
    InvalidJpegQuality(u32),
}

/// 撮影解像度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSize {
    /// 96x96
    R96x96,
    /// 160x120
    Qqvga,
    /// 176x144
    Qcif,
    /// 240x176
    Hqvga,
    /// 240x240
    R240x240,
    /// 320x240
    Qvga,
    /// 400x296
    Cif,
    /// 480x320
    Hvga,
    /// 640x480
    Vga,
    /// 800x600
    Svga,
    /// 1024x768
    Xga,
    /// 1280x720
    Hd,
    /// 1280x1024
    Sxga,
    /// 1600x1200
    Uxga,
}

impl FrameSize {
    /// 文字列からフレームサイズを取得します。無効な場合は QVGA を使用します
    pub fn from_string(size_str: &str) -> FrameSize {
        size_str.parse().unwrap_or_else(|_| {
            warn!(
                "無効なフレームサイズ '{}' のため QVGA を使用します",
                size_str
            );
            FrameSize::Qvga
        })
    }

    /// 幅と高さ（ピクセル）
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            FrameSize::R96x96 => (96, 96),
            FrameSize::Qqvga => (160, 120),
            FrameSize::Qcif => (176, 144),
            FrameSize::Hqvga => (240, 176),
            FrameSize::R240x240 => (240, 240),
            FrameSize::Qvga => (320, 240),
            FrameSize::Cif => (400, 296),
            FrameSize::Hvga => (480, 320),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Hd => (1280, 720),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Uxga => (1600, 1200),
        }
    }

    /// esp32-camera の `framesize_t` 定数に変換します
    #[cfg(target_os = "espidf")]
    pub fn as_framesize_t(&self) -> esp_idf_sys::camera::framesize_t {
        use esp_idf_sys::camera::*;
        match self {
            FrameSize::R96x96 => framesize_t_FRAMESIZE_96X96,
            FrameSize::Qqvga => framesize_t_FRAMESIZE_QQVGA,
            FrameSize::Qcif => framesize_t_FRAMESIZE_QCIF,
            FrameSize::Hqvga => framesize_t_FRAMESIZE_HQVGA,
            FrameSize::R240x240 => framesize_t_FRAMESIZE_240X240,
            FrameSize::Qvga => framesize_t_FRAMESIZE_QVGA,
            FrameSize::Cif => framesize_t_FRAMESIZE_CIF,
            FrameSize::Hvga => framesize_t_FRAMESIZE_HVGA,
            FrameSize::Vga => framesize_t_FRAMESIZE_VGA,
            FrameSize::Svga => framesize_t_FRAMESIZE_SVGA,
            FrameSize::Xga => framesize_t_FRAMESIZE_XGA,
            FrameSize::Hd => framesize_t_FRAMESIZE_HD,
            FrameSize::Sxga => framesize_t_FRAMESIZE_SXGA,
            FrameSize::Uxga => framesize_t_FRAMESIZE_UXGA,
        }
    }
}

impl FromStr for FrameSize {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "96X96" => Ok(FrameSize::R96x96),
            "QQVGA" => Ok(FrameSize::Qqvga),
            "QCIF" => Ok(FrameSize::Qcif),
            "HQVGA" => Ok(FrameSize::Hqvga),
            "240X240" => Ok(FrameSize::R240x240),
            "QVGA" => Ok(FrameSize::Qvga),
            "CIF" => Ok(FrameSize::Cif),
            "HVGA" => Ok(FrameSize::Hvga),
            "VGA" => Ok(FrameSize::Vga),
            "SVGA" => Ok(FrameSize::Svga),
            "XGA" => Ok(FrameSize::Xga),
            "HD" => Ok(FrameSize::Hd),
            "SXGA" => Ok(FrameSize::Sxga),
            "UXGA" => Ok(FrameSize::Uxga),
            _ => Err(CameraError::UnknownFrameSize(s.to_string())),
        }
    }
}

/// 固定の撮影プロファイル（JPEG、解像度、品質）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureProfile {
    pub frame_size: FrameSize,
    /// 0〜63、数値が大きいほど低品質
    pub jpeg_quality: u8,
}

impl CaptureProfile {
    pub fn new(frame_size: FrameSize, jpeg_quality: u32) -> Result<Self, CameraError> {
        if jpeg_quality > 63 {
            return Err(CameraError::InvalidJpegQuality(jpeg_quality));
        }
        Ok(Self {
            frame_size,
            jpeg_quality: jpeg_quality as u8,
        })
    }
}

impl Default for CaptureProfile {
    fn default() -> Self {
        Self {
            frame_size: FrameSize::Qvga,
            jpeg_quality: 10,
        }
    }
}
