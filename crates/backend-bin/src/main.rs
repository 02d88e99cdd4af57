use convoy_backend_lib::{config::Settings, store::FlatFileStore, ws_router, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().unwrap_or_else(|err| {
        eprintln!("no usable config ({err}), falling back to defaults");
        Settings::default()
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    let store = FlatFileStore::new(&settings.data_dir)?;
    let bind_addr = settings.bind_addr;
    let state = Arc::new(AppState::new(store, settings));

    let app = ws_router::create_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "convoy server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
