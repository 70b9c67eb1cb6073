#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{peripherals::Peripherals, reset},
    nvs::EspDefaultNvsPartition,
    wifi::{BlockingWifi, EspWifi},
};
#[cfg(target_os = "espidf")]
use esp_camera_mqtt::{
    config::{AppConfig, PipelineMode},
    ensure_connected, shared, AiThinkerPins, ButtonInput, CameraController, CapturePipeline,
    FileStageStore, Fragmenter, FreeRtosDelay, InlinePipeline, MqttSettings, MqttTransport,
    PipelineWorker, TickLoop, TriggerMonitor, WifiLink, VERSION,
};
#[cfg(target_os = "espidf")]
use log::{error, info};

/// ボタン入力ピン（アクティブロー、内部プルアップ）
#[cfg(target_os = "espidf")]
const BUTTON_GPIO: u8 = 4;

/// SPIFFS で同時に開けるファイル数
#[cfg(target_os = "espidf")]
const SPIFFS_MAX_FILES: usize = 5;

/// アプリケーションのメインエントリーポイント
#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    // ESP-IDFの各種初期化
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    info!("esp-camera-mqtt v{} を起動しています", VERSION);

    // 設定をロード
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("設定ファイルの読み込みに失敗しました: {}", e);
            return Err(e.into());
        }
    };

    info!("ペリフェラルを初期化しています");
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut delay = FreeRtosDelay;

    // ボタン
    let button = ButtonInput::new(peripherals.pins.gpio4.into())?;
    info!("ボタンを GPIO{} に設定しました", BUTTON_GPIO);

    // Wi-Fi（接続できるまで待つ）
    let wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?;
    let mut link = WifiLink::new(wifi, &config.wifi_ssid, &config.wifi_password);
    ensure_connected(&mut link, &config.wifi_retry_policy(), &mut delay)?;

    // SPIFFS
    if let Err(e) = esp_camera_mqtt::storage::mount_spiffs(
        config.storage_base_path(),
        SPIFFS_MAX_FILES,
        true,
    ) {
        error!("SPIFFS のマウントに失敗しました。再起動します: {}", e);
        reset::restart();
    }
    let store = FileStageStore::new(config.stage_path.as_str());

    // カメラ
    let pins = AiThinkerPins {
        pwdn: peripherals.pins.gpio32,
        xclk: peripherals.pins.gpio0,
        sda: peripherals.pins.gpio26,
        scl: peripherals.pins.gpio27,
        d7: peripherals.pins.gpio35,
        d6: peripherals.pins.gpio34,
        d5: peripherals.pins.gpio39,
        d4: peripherals.pins.gpio36,
        d3: peripherals.pins.gpio21,
        d2: peripherals.pins.gpio19,
        d1: peripherals.pins.gpio18,
        d0: peripherals.pins.gpio5,
        vsync: peripherals.pins.gpio25,
        href: peripherals.pins.gpio23,
        pclk: peripherals.pins.gpio22,
    };
    let camera = match CameraController::new(pins, config.capture_profile) {
        Ok(camera) => camera,
        Err(e) => {
            error!("カメラの初期化に失敗しました。再起動します: {}", e);
            reset::restart();
        }
    };

    // MQTT
    let mut transport = MqttTransport::new(MqttSettings {
        broker_url: config.broker_url(),
        client_id: config.mqtt_client_id.clone(),
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        keep_alive: config.mqtt_keep_alive,
        connect_timeout_ms: config.mqtt_connect_timeout_ms,
    });
    ensure_connected(&mut transport, &config.mqtt_retry_policy(), &mut delay)?;

    let pipeline = CapturePipeline::new(
        camera,
        store,
        Fragmenter::new(
            config.mqtt_topic.as_str(),
            config.max_chunk_size,
            config.chunk_delay_ms,
        ),
        config.min_image_size,
        config.capture_retry_policy(),
    );
    let trigger = TriggerMonitor::new(button);

    info!("セットアップ完了、パイプラインモード: {:?}", config.pipeline_mode);
    match config.pipeline_mode {
        PipelineMode::Inline => TickLoop::new(
            link,
            transport,
            trigger,
            InlinePipeline::new(pipeline, FreeRtosDelay),
            delay,
            config.wifi_retry_policy(),
            config.mqtt_retry_policy(),
            config.tick_interval_ms,
        )
        .run(),
        PipelineMode::Worker => {
            let worker: PipelineWorker<MqttTransport> =
                PipelineWorker::spawn(pipeline, FreeRtosDelay, config.worker_stack_size)?;
            TickLoop::new(
                link,
                shared(transport),
                trigger,
                worker,
                delay,
                config.wifi_retry_policy(),
                config.mqtt_retry_policy(),
                config.tick_interval_ms,
            )
            .run()
        }
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("button_cam runs only on ESP-IDF targets; build with an espidf target triple")
}
