use std::sync::Arc;

use crate::{
    auth::jwt::JwtKeys,
    config::AppConfig,
    services::{DirectoryService, RoleGate, RoleStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub jwt: JwtKeys,
    pub token_leeway_secs: u64,
    pub gate: RoleGate,
    pub directory: DirectoryService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn RoleStore>) -> anyhow::Result<Arc<Self>> {
        let auth = config.auth()?;
        let jwt = JwtKeys::from_secret(auth.jwt_secret.as_bytes());
        let token_leeway_secs = auth.leeway_secs;
        let gate = RoleGate::new(Arc::clone(&store), &config.directory);
        let directory = DirectoryService::new(store);

        Ok(Arc::new(Self {
            config,
            jwt,
            token_leeway_secs,
            gate,
            directory,
        }))
    }
}
