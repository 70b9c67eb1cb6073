use std::time::Duration;

/// ブロッキング待機の抽象化
///
/// 再接続ループやチャンク間ディレイはこのトレイト経由で待機するため、
/// テストでは実際にスリープせずに待機回数と時間を記録できます。
pub trait Delay {
    /// 指定ミリ秒だけ現在のタスクをブロックします
    fn delay_ms(&mut self, ms: u32);

    fn delay(&mut self, duration: Duration) {
        let ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        self.delay_ms(ms);
    }
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

/// `std::thread::sleep` による待機
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(u64::from(ms)));
        }
    }
}

/// FreeRTOS のタスクディレイによる待機
#[cfg(target_os = "espidf")]
#[derive(Debug, Default, Clone, Copy)]
pub struct FreeRtosDelay;

#[cfg(target_os = "espidf")]
impl Delay for FreeRtosDelay {
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }
}
