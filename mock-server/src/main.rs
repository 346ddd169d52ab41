use mock_sanity::MockStore;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mock_sanity=info")),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3333".to_string());

    let mut store = match std::env::var("MOCK_SEED") {
        Ok(path) => {
            let seed = std::fs::read_to_string(&path)?;
            tracing::info!(path = %path, "loading seed documents");
            MockStore::from_seed(&seed)?
        }
        Err(_) => MockStore::new(),
    };
    if let Ok(token) = std::env::var("MOCK_TOKEN") {
        store = store.with_token(token);
    }

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");
    mock_sanity::run(listener, store).await?;
    Ok(())
}
