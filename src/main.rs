use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;

use laundry_admin::{
    auth::bootstrap::ensure_super_admin,
    config::AppConfig,
    db::connection,
    logging::init_tracing,
    routes::app,
    services::{DbRoleStore, RoleStore},
    state::AppState,
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!("server failed: {err:?}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env()?;
    init_tracing(&cfg.logging);

    let db = connection::connect(cfg.database()?).await?;
    let store: Arc<dyn RoleStore> = Arc::new(DbRoleStore::new(&db));

    ensure_super_admin(cfg.auth()?, store.as_ref()).await?;

    let state = AppState::new(cfg, store)?;

    let addr: SocketAddr = format!("{}:{}", state.config.general.host, state.config.general.port)
        .parse()
        .context("invalid host/port")?;
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(Arc::clone(&state))).await?;
    Ok(())
}
