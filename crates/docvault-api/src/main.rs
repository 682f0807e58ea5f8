mod error;
mod handlers;
mod services;
mod setup;
mod state;
mod telemetry;

use docvault_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    telemetry::init_telemetry(&config);

    let (state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router, state).await?;

    Ok(())
}
