use crate::{
    config::{AppConfig, Secrets},
    core::video::UrlSigner,
    integrations::{email::Mailer, payments::PaymentGateway},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Everything handlers need, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub secrets: Arc<Secrets>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
    pub signer: UrlSigner,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        config: AppConfig,
        secrets: Secrets,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let signer = UrlSigner::new(
            &config.storage.base_url,
            &secrets.storage_signing_key,
            config.storage.url_ttl_secs,
        );
        Self {
            db,
            config: Arc::new(config),
            secrets: Arc::new(secrets),
            gateway,
            mailer,
            signer,
        }
    }
}
