mod admin;
mod app;
mod auth;
mod config;
mod error;
mod geo;
mod photos;
mod punch;
mod remarks;
mod state;
mod storage;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // `attendance hash-password <plain>` prints an argon2 hash for credentials.json
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("hash-password") {
        let plain = args
            .next()
            .ok_or_else(|| anyhow::anyhow!("usage: attendance hash-password <password>"))?;
        println!("{}", auth::password::hash_password(&plain)?);
        return Ok(());
    }

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "attendance=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;
    app::serve(app::build_app(app_state)).await
}
