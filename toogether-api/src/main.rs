use std::sync::Arc;

use toogether_api::config::AppConfig;
use toogether_api::store::PgStore;
use toogether_api::{router, AppState};
use toogether_graph::ports::SystemClock;
use toogether_shared::clients::db::create_pool;
use toogether_shared::clients::email::EmailClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    toogether_shared::middleware::init_tracing("toogether-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let pool = create_pool(&config.database_url, config.db_pool_size)?;
    let metrics_handle = toogether_shared::middleware::init_metrics()?;
    let email = EmailClient::new(&config.resend_api_key, &config.from_email, "Toogether");

    let state = Arc::new(AppState::new(
        config,
        Arc::new(PgStore::new(pool)),
        email,
        Arc::new(SystemClock),
        metrics_handle,
    ));

    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "toogether-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
