// code updated from https://github.com/Kezii/esp32cam_rs/blob/master/src/espcam.rs

use std::ffi::c_int;
use std::marker::PhantomData;

use esp_idf_hal::gpio::*;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_sys::*;
use log::error;

impl<'a> Camera<'a> {
    pub fn new(params: &CameraParams) -> Result<Self, esp_idf_sys::EspError> {
        let config = camera::camera_config_t {
            pin_pwdn: params.power,
            pin_xclk: params.clock,
            pin_reset: -1,
            pin_d0: params.d0,
            pin_d1: params.d1,
            pin_d2: params.d2,
            pin_d3: params.d3,
            pin_d4: params.d4,
            pin_d5: params.d5,
            pin_d6: params.d6,
            pin_d7: params.d7,
            pin_vsync: params.vertical_sync,
            pin_href: params.horizontal_reference,
            pin_pclk: params.pixel_clock,

            xclk_freq_hz: 20_000_000,
            ledc_timer: esp_idf_sys::ledc_timer_t_LEDC_TIMER_0,
            ledc_channel: esp_idf_sys::ledc_channel_t_LEDC_CHANNEL_0,

            pixel_format: params.pixel_format,
            frame_size: params.frame_size,

            jpeg_quality: params.jpeg_quality,
            fb_count: 1,
            grab_mode: camera::camera_grab_mode_t_CAMERA_GRAB_WHEN_EMPTY,

            fb_location: params.fb_location,

            __bindgen_anon_1: camera::camera_config_t__bindgen_ty_1 {
                pin_sccb_sda: params.sda,
            },
            __bindgen_anon_2: camera::camera_config_t__bindgen_ty_2 {
                pin_sccb_scl: params.scl,
            },
            ..Default::default()
        };

        esp_idf_sys::esp!(unsafe { camera::esp_camera_init(&config) })?;
        Ok(Self { _p: PhantomData })
    }

    pub fn get_framebuffer(&self) -> Option<FrameBuffer<'_>> {
        let fb = unsafe { camera::esp_camera_fb_get() };
        if fb.is_null() {
            None
        } else {
            Some(FrameBuffer {
                fb,
                _p: PhantomData,
            })
        }
    }
}

impl<'a> Drop for Camera<'a> {
    fn drop(&mut self) {
        if let Err(e) = esp!(unsafe { camera::esp_camera_deinit() }) {
            error!("esp_camera_deinit に失敗しました: {:?}", e);
        }
    }
}

/// ドライバから借りているフレームバッファ
///
/// ドロップ時に `esp_camera_fb_return` でドライバへ 1 回だけ返却されます。
pub struct FrameBuffer<'a> {
    fb: *mut camera::camera_fb_t,
    _p: PhantomData<&'a camera::camera_fb_t>,
}

impl<'a> FrameBuffer<'a> {
    pub fn data(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts((*self.fb).buf, (*self.fb).len) }
    }

    pub fn width(&self) -> usize {
        unsafe { (*self.fb).width }
    }

    pub fn height(&self) -> usize {
        unsafe { (*self.fb).height }
    }
}

impl AsRef<[u8]> for FrameBuffer<'_> {
    fn as_ref(&self) -> &[u8] {
        self.data()
    }
}

impl Drop for FrameBuffer<'_> {
    fn drop(&mut self) {
        unsafe { camera::esp_camera_fb_return(self.fb) }
    }
}

pub struct Camera<'a> {
    _p: PhantomData<&'a ()>,
}

pub struct CameraParams<'a> {
    power: c_int,
    clock: c_int,
    d0: c_int,
    d1: c_int,
    d2: c_int,
    d3: c_int,
    d4: c_int,
    d5: c_int,
    d6: c_int,
    d7: c_int,
    vertical_sync: c_int,
    horizontal_reference: c_int,
    pixel_clock: c_int,
    sda: c_int,
    scl: c_int,
    pixel_format: camera::pixformat_t,
    frame_size: camera::framesize_t,
    jpeg_quality: c_int,
    fb_location: camera::camera_fb_location_t,
    _p: PhantomData<&'a ()>,
}

impl CameraParams<'static> {
    pub fn new() -> CameraParams<'static> {
        Self {
            power: -1,
            clock: -1,
            d0: -1,
            d1: -1,
            d2: -1,
            d3: -1,
            d4: -1,
            d5: -1,
            d6: -1,
            d7: -1,
            vertical_sync: -1,
            horizontal_reference: -1,
            pixel_clock: -1,
            sda: -1,
            scl: -1,
            pixel_format: camera::pixformat_t_PIXFORMAT_JPEG,
            frame_size: camera::framesize_t_FRAMESIZE_QVGA,
            jpeg_quality: 12,
            fb_location: camera::camera_fb_location_t_CAMERA_FB_IN_DRAM,
            _p: PhantomData,
        }
    }
}

macro_rules! define_set_pin_function {
    ($name:ident, $direction:ty) => {
        concat_idents::concat_idents!(
            fn_name = set_,
            $name,
            _pin {
            pub fn fn_name(self, p: impl Peripheral<P = impl $direction> + 'a) -> CameraParams<'a> {
                CameraParams {
                    $name: p.into_ref().pin(),
                    _p: PhantomData,
                    ..self
                }
            }
        });
    };
}

impl<'a> CameraParams<'a> {
    define_set_pin_function!(power, OutputPin);
    define_set_pin_function!(clock, OutputPin);
    define_set_pin_function!(d0, InputPin);
    define_set_pin_function!(d1, InputPin);
    define_set_pin_function!(d2, InputPin);
    define_set_pin_function!(d3, InputPin);
    define_set_pin_function!(d4, InputPin);
    define_set_pin_function!(d5, InputPin);
    define_set_pin_function!(d6, InputPin);
    define_set_pin_function!(d7, InputPin);
    define_set_pin_function!(vertical_sync, InputPin);
    define_set_pin_function!(horizontal_reference, InputPin);
    define_set_pin_function!(pixel_clock, InputPin);
    define_set_pin_function!(sda, IOPin);
    define_set_pin_function!(scl, OutputPin);

    pub fn set_frame_size(self, frame_size: camera::framesize_t) -> CameraParams<'a> {
        CameraParams { frame_size, ..self }
    }

    pub fn set_jpeg_quality(self, jpeg_quality: c_int) -> CameraParams<'a> {
        CameraParams {
            jpeg_quality,
            ..self
        }
    }

    pub fn set_fb_location(self, fb_location: camera::camera_fb_location_t) -> CameraParams<'a> {
        CameraParams {
            fb_location,
            ..self
        }
    }
}
