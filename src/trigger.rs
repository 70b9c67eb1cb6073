use log::debug;

/// トリガー入力のレベルを読み取る
///
/// アクティブローのボタンの場合、ピンが Low のときに `true` を返します。
pub trait TriggerInput {
    fn is_active(&mut self) -> bool;
}

/// トリガーのラッチ状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    /// ボタンは離されている
    Idle,
    /// 押下エッジを発行済みで、離されるのを待っている
    Pressed,
}

/// 押下エッジ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEdge;

/// モーメンタリ入力を押下 1 回につき 1 エッジに変換するモニター
///
/// 時間ベースのチャタリング除去は行いません。tick ごとに 1 回のレベル読み取りを前提とし、
/// 押下中にレベルが揺れた場合はエッジが重複することがあります。
pub struct TriggerMonitor<I> {
    input: I,
    state: TriggerState,
}

impl<I: TriggerInput> TriggerMonitor<I> {
    pub fn new(input: I) -> Self {
        Self {
            input,
            state: TriggerState::Idle,
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    /// 入力レベルを 1 回読み取り、押下された最初の tick でのみエッジを返します
    pub fn poll(&mut self) -> Option<TriggerEdge> {
        let active = self.input.is_active();
        match (self.state, active) {
            (TriggerState::Idle, true) => {
                debug!("ボタンが押されました");
                self.state = TriggerState::Pressed;
                Some(TriggerEdge)
            }
            (TriggerState::Pressed, false) => {
                debug!("ボタンが離されました");
                self.state = TriggerState::Idle;
                None
            }
            _ => None,
        }
    }
}

/// プルアップ付きのアクティブローボタン
#[cfg(target_os = "espidf")]
pub struct ButtonInput {
    pin: esp_idf_svc::hal::gpio::PinDriver<
        'static,
        esp_idf_svc::hal::gpio::AnyIOPin,
        esp_idf_svc::hal::gpio::Input,
    >,
}

#[cfg(target_os = "espidf")]
impl ButtonInput {
    /// ボタンピンを内部プルアップ付きの入力として初期化します
    pub fn new(pin: esp_idf_svc::hal::gpio::AnyIOPin) -> Result<Self, esp_idf_sys::EspError> {
        let mut pin = esp_idf_svc::hal::gpio::PinDriver::input(pin)?;
        pin.set_pull(esp_idf_svc::hal::gpio::Pull::Up)?;
        Ok(Self { pin })
    }
}

#[cfg(target_os = "espidf")]
impl TriggerInput for ButtonInput {
    fn is_active(&mut self) -> bool {
        self.pin.is_low()
    }
}
