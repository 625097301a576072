//! Component graph shared by every command.

use auth_gateway::{GatewayConfig, SsoGatewayClient};
use bridge_engine::{BridgeEngine, Collaborators, EngineConfig};
use bridge_protocol::NavigationTarget;
use device_identity::{DeviceFacts, DeviceIdentityProvider};
use shell_config_and_utils::{Config, Paths};
use std::sync::Arc;
use token_storage::{
    CookiePolicy, CookieTokenStore, EncryptedFileStorage, SecureTokenStore,
};
use tracing::debug;
use url::Url;

pub struct ShellState {
    pub engine: Arc<BridgeEngine>,
    pub secure: Arc<SecureTokenStore>,
    pub cookies: Arc<CookieTokenStore>,
    pub device: Arc<DeviceIdentityProvider>,
    pub web_base: Url,
    pub app_version: String,
}

impl ShellState {
    /// Open the secure store under `paths` and wire the engine.
    pub fn build(
        config: &Config,
        paths: &Paths,
        collaborators: Collaborators,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let storage =
            EncryptedFileStorage::open(paths.secure_store_file(), &paths.secure_store_key_file())?;
        let secure = Arc::new(SecureTokenStore::new(Box::new(storage)));

        let cookies = Arc::new(CookieTokenStore::new(
            CookiePolicy::embedded().with_max_age_days(config.cookie_max_age_days),
        ));

        let device = Arc::new(DeviceIdentityProvider::new(
            secure.clone(),
            DeviceFacts::detect(),
        ));

        let gateway = Arc::new(SsoGatewayClient::new(
            GatewayConfig::new(config.sso_base_url()?).with_timeout(config.network_timeout()),
        ));

        let mut engine_config = EngineConfig::new(NavigationTarget::parse(&config.home_route)?);
        engine_config.login_route = config.login_route.clone();
        engine_config.app_version = config.app_version.clone();
        engine_config.network_timeout = config.network_timeout();
        engine_config.cookie_clear_retry = config.cookie_clear_retry_delay();
        engine_config.location_timeout = config.location_timeout();

        let engine = Arc::new(BridgeEngine::new(
            secure.clone(),
            cookies.clone(),
            gateway,
            device.clone(),
            collaborators,
            engine_config,
        ));

        debug!(
            sso = %config.sso_base_url,
            web = %config.web_base_url,
            "Shell state ready"
        );

        Ok(Self {
            engine,
            secure,
            cookies,
            device,
            web_base: config.web_base_url()?,
            app_version: config.app_version.clone(),
        })
    }
}
