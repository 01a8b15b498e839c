use rv_engine::{serve, RiskAnalyzer, ServiceConfig};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let config = ServiceConfig::from_env()?;
    let provider = rv_data::build_provider(&config.data_source)?;
    info!("Price provider: {} {}", provider.name(), provider.config());

    let analyzer = RiskAnalyzer::new(provider);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("RiskVision risk service listening on {}", config.bind_addr);

    serve(listener, analyzer, config.read_timeout).await?;
    Ok(())
}
