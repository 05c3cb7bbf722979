use clap::Parser;
use dotenvy::dotenv;
use squirrel::{
    cli::{self, Cli, CliData},
    config::{catalog, database},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 2. Load .env file; variables may just as well come from the environment
    dotenv().ok();

    let cli = Cli::parse();

    // 3. Load the catalog configuration
    let config = catalog::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect to the database and make sure the schema exists
    let url = cli.database_url.clone().unwrap_or_else(database::get_database_url);
    let db = database::create_connection(&url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;
    info!("Database initialized successfully.");

    // 5. Run the command
    let data = CliData::new(db, config);
    cli::run(cli.command, &data)
        .await
        .inspect_err(|e| error!("Command failed: {}", e))
}
