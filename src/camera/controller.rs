use super::driver::{Camera, CameraParams, FrameBuffer};
use super::{CameraError, CaptureProfile};
use crate::capture::CaptureSource;
use esp_idf_svc::hal::gpio;
use esp_idf_sys::camera::camera_fb_location_t_CAMERA_FB_IN_DRAM;
use log::{error, info};

/// ESP32-CAM (AI-Thinker) のカメラ接続ピン
pub struct AiThinkerPins {
    pub pwdn: gpio::Gpio32,
    pub xclk: gpio::Gpio0,
    pub sda: gpio::Gpio26,
    pub scl: gpio::Gpio27,
    pub d7: gpio::Gpio35,
    pub d6: gpio::Gpio34,
    pub d5: gpio::Gpio39,
    pub d4: gpio::Gpio36,
    pub d3: gpio::Gpio21,
    pub d2: gpio::Gpio19,
    pub d1: gpio::Gpio18,
    pub d0: gpio::Gpio5,
    pub vsync: gpio::Gpio25,
    pub href: gpio::Gpio23,
    pub pclk: gpio::Gpio22,
}

/// ESP32-CAM (AI-Thinker) 向けのカメラコントローラー
pub struct CameraController {
    camera: Camera<'static>,
}

impl CameraController {
    /// ペリフェラルから新しいカメラコントローラーを作成します
    ///
    /// # 引数
    ///
    /// * `pins` - カメラモジュールの接続ピン
    /// * `profile` - 固定の撮影プロファイル（解像度と JPEG 品質）
    ///
    /// # エラー
    ///
    /// カメラの初期化に失敗した場合にエラーを返します
    pub fn new(pins: AiThinkerPins, profile: CaptureProfile) -> Result<Self, CameraError> {
        info!(
            "カメラを初期化しています: {:?} ({}x{}), JPEG 品質 {}",
            profile.frame_size,
            profile.frame_size.dimensions().0,
            profile.frame_size.dimensions().1,
            profile.jpeg_quality
        );

        let camera_params = CameraParams::new()
            .set_power_pin(pins.pwdn)
            .set_clock_pin(pins.xclk)
            .set_d0_pin(pins.d0)
            .set_d1_pin(pins.d1)
            .set_d2_pin(pins.d2)
            .set_d3_pin(pins.d3)
            .set_d4_pin(pins.d4)
            .set_d5_pin(pins.d5)
            .set_d6_pin(pins.d6)
            .set_d7_pin(pins.d7)
            .set_vertical_sync_pin(pins.vsync)
            .set_horizontal_reference_pin(pins.href)
            .set_pixel_clock_pin(pins.pclk)
            .set_sda_pin(pins.sda)
            .set_scl_pin(pins.scl)
            .set_frame_size(profile.frame_size.as_framesize_t())
            .set_jpeg_quality(i32::from(profile.jpeg_quality))
            .set_fb_location(camera_fb_location_t_CAMERA_FB_IN_DRAM);

        let camera =
            Camera::new(&camera_params).map_err(|e| CameraError::InitFailed(format!("{:?}", e)))?;

        Ok(Self { camera })
    }
}

impl CaptureSource for CameraController {
    type Frame<'a> = FrameBuffer<'a>;

    fn capture(&mut self) -> Option<FrameBuffer<'_>> {
        info!("ESP32-CAM で撮影しています...");
        let frame = self.camera.get_framebuffer();
        match &frame {
            Some(fb) => info!(
                "{}x{} のフレームを撮影しました ({} バイト)",
                fb.width(),
                fb.height(),
                fb.data().len()
            ),
            None => error!("{}", CameraError::CaptureFailed),
        }
        frame
    }
}
