use std::{
    net::{Ipv4Addr, SocketAddrV4},
    sync::Arc,
};

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use otp_service::{
    audit, broker::Broker, config::Config, router::build_router, service::OtpService,
    state::AppState, store::MemoryStore,
};

const ADDRESS: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load(std::env::args().skip(1), |key| std::env::var(key).ok())?;

    let broker = Arc::new(Broker::new());
    audit::register(&broker)?;

    let store = MemoryStore::with_config(broker.clone(), config.store_config());
    let state = AppState::new(OtpService::new(store, broker, config.ttl));

    let listener = TcpListener::bind(SocketAddrV4::new(ADDRESS, config.port)).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        ttl_secs = state.otp.ttl().as_secs(),
        "OTP service listening"
    );
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
