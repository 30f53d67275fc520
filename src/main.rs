use color_eyre::eyre::Result;
use dotenv::dotenv;
use slotbook_api::config::ApiConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env()?;

    // Connect the store and start the API server
    slotbook_api::start_server(config).await?;

    Ok(())
}
