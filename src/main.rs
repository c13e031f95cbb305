use posts_api::{
    AppState,
    config::{Config, DatabaseUrl},
    routes::app,
    store::MemoryStore,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run().await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let store = match &config.database_url {
        DatabaseUrl::Memory => {
            info!("Using in-memory store; data is lost on restart");
            MemoryStore::new()
        }
        DatabaseUrl::File(path) => MemoryStore::open(path).await?,
    };

    let app = app(AppState::from_store(store), config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    info!("Server running on http://{}", config.bind_addr);
    info!("API Endpoints:");
    info!("  GET    /health           - Health check");
    info!("  GET    /users            - List users");
    info!("  POST   /users            - Create user");
    info!("  GET    /users/:id        - Get user");
    info!("  PUT    /users/:id        - Update user");
    info!("  DELETE /users/:id        - Delete user");
    info!("  GET    /users/:id/posts  - List a user's posts");
    info!("  GET    /posts            - List posts");
    info!("  POST   /posts            - Create post");
    info!("  GET    /posts/:id        - Get post");
    info!("  PUT    /posts/:id        - Update post");
    info!("  DELETE /posts/:id        - Delete post");
    info!("  POST   /posts/:id/like   - Like post");

    axum::serve(listener, app).await?;
    Ok(())
}
