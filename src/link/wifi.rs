use super::LinkError;
use crate::session::Session;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::info;

/// Wi-Fi ステーションモードのリンクセッション
pub struct WifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
    configured: bool,
    ssid: String,
    password: String,
}

impl WifiLink {
    /// 新しい Wi-Fi リンクを作成します（接続は `connect` で行います）
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>, ssid: &str, password: &str) -> Self {
        Self {
            wifi,
            configured: false,
            ssid: ssid.to_string(),
            password: password.to_string(),
        }
    }

    fn configure(&mut self) -> Result<(), LinkError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let configuration = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| LinkError::InvalidCredentials("SSID が長すぎます".to_string()))?,
            password: self.password.as_str().try_into().map_err(|_| {
                LinkError::InvalidCredentials("パスワードが長すぎます".to_string())
            })?,
            auth_method,
            ..Default::default()
        });

        self.wifi
            .set_configuration(&configuration)
            .map_err(|e| LinkError::ConfigurationFailed(format!("{:?}", e)))?;
        self.configured = true;
        Ok(())
    }
}

impl Session for WifiLink {
    type Error = LinkError;

    fn name(&self) -> &'static str {
        "Wi-Fi"
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn connect(&mut self) -> Result<(), LinkError> {
        if !self.configured {
            self.configure()?;
        }

        let started = self
            .wifi
            .is_started()
            .map_err(|e| LinkError::ConnectFailed(format!("{:?}", e)))?;
        if !started {
            self.wifi
                .start()
                .map_err(|e| LinkError::ConnectFailed(format!("{:?}", e)))?;
        }

        self.wifi
            .connect()
            .map_err(|e| LinkError::ConnectFailed(format!("{:?}", e)))?;
        self.wifi
            .wait_netif_up()
            .map_err(|e| LinkError::ConnectFailed(format!("{:?}", e)))?;

        if let Ok(ip_info) = self.wifi.wifi().sta_netif().get_ip_info() {
            info!("IP アドレス: {}", ip_info.ip);
        }
        Ok(())
    }
}
