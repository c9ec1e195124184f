use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use content_gateway::config::Args;
use content_gateway::handlers::router;
use content_gateway::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let state = Arc::new(AppState::from_args(&args)?);
    let app = router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, llm_url = %args.llm_url, model = %args.llm_model, "content gateway running");
    info!(
        ttl_hours = args.scrape_ttl_hours,
        max_entries = args.scrape_max_entries,
        "scrape cache configured"
    );
    info!(
        rate_limit = args.rate_limit,
        window_secs = args.rate_window,
        "rate limit configured"
    );
    if args.admin_token.is_none() {
        info!("no admin token set, admin endpoints disabled");
    }

    axum::serve(listener, app).await?;
    Ok(())
}
