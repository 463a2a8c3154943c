use chargesim_api::create_app;
use chargesim_core::SimulationParameters;
use chargesim_engine::Engine;
use clap::Parser;
use std::path::PathBuf;

/// Command line arguments for the chargesim server
#[derive(Parser, Debug)]
#[command(name = "chargesim")]
#[command(about = "EV charging facility simulation server")]
struct Args {
    /// Path to a simulation parameters JSON file; defaults apply if omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to bind the server to
    #[arg(short, long, default_value = "3000")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt().pretty().init();

    // Load simulation parameters from JSON file, or fall back to defaults
    let params = match &args.config {
        Some(path) => {
            let config_content = tokio::fs::read_to_string(path).await.map_err(|e| {
                format!("Failed to read config file '{}': {}", path.display(), e)
            })?;
            let params: SimulationParameters =
                serde_json::from_str(&config_content).map_err(|e| {
                    format!("Failed to parse config file '{}': {}", path.display(), e)
                })?;
            tracing::info!(
                "Loaded simulation parameters from {}: {} stations",
                path.display(),
                params.station_count
            );
            params
        }
        None => {
            tracing::info!("No config file given, using default simulation parameters");
            SimulationParameters::default()
        }
    };

    // Fail fast on contract violations before the server comes up
    let engine = Engine::new();
    engine
        .initialize(params)
        .map_err(|e| format!("Invalid simulation parameters: {}", e))?;

    // Build our application with routes
    let app = create_app(engine);

    // Run our app with hyper
    let bind_addr = format!("0.0.0.0:{}", args.port);
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", bind_addr, e))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    Ok(())
}
