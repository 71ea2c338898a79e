mod config;
mod handlers;
mod models;
mod services;

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;

use config::AnalyzerConfig;
use handlers::MealHandler;
use models::Goal;
use services::{GeminiProvider, ImageAnalyzer, ImagePayload};

/// Estimate the nutrition of meal photos and log them against a calorie goal
#[derive(Debug, Parser)]
#[command(name = "snapcal", version)]
struct Cli {
    /// Image files, or `data:` URLs, to analyze
    #[arg(required = true)]
    images: Vec<String>,

    /// Calorie goal: lose-weight, maintain-weight or gain-weight
    #[arg(short, long, env = "SNAPCAL_GOAL")]
    goal: Option<Goal>,

    /// User the meals are logged for
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Gemini model, overrides GEMINI_MODEL
    #[arg(long)]
    model: Option<String>,

    /// Attempts per API key before falling back to the next
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Per-request timeout in seconds, overrides GEMINI_TIMEOUT_SECS
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the food log as JSON after analyzing
    #[arg(long)]
    json: bool,
}

fn load_image(arg: &str) -> Result<ImagePayload> {
    if arg.starts_with("data:") {
        return Ok(ImagePayload::from_data_url(arg));
    }
    ImagePayload::from_path(arg).with_context(|| format!("failed to read image {}", arg))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init();

    let cli = Cli::parse();

    log::info!("🚀 Starting SnapCal...");

    let mut config = AnalyzerConfig::from_env();
    if let Some(model) = cli.model.clone() {
        config = config.with_model(model);
    }
    if let Some(attempts) = cli.max_attempts {
        config = config.with_max_attempts(attempts);
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }
    log::debug!("{:?}", config);

    let provider = Arc::new(GeminiProvider::new(config.model.clone(), config.request_timeout)?);
    let analyzer = Arc::new(ImageAnalyzer::new(&config, provider));
    log::info!(
        "✅ Gemini analyzer initialized with model {} and {} API key(s)",
        config.model,
        analyzer.key_count()
    );

    let meal_handler = MealHandler::new(analyzer);

    if let Some(goal) = cli.goal {
        println!("🎯 {} ({} kcal): {}\n", goal.title(), goal.calorie_target(), goal.description());
    }

    for arg in &cli.images {
        let image = match load_image(arg) {
            Ok(image) => image,
            Err(e) => {
                log::error!("{:#}", e);
                println!("❌ {:#}\n", e);
                continue;
            }
        };

        // Keep data URLs out of the stored log
        let image_url = (!arg.starts_with("data:")).then(|| arg.clone());
        let reply = meal_handler
            .handle_food_image(&cli.user, cli.goal, &image, image_url)
            .await;
        println!("{}\n", reply);
    }

    let progress = meal_handler.daily_progress(&cli.user, cli.goal).await;
    println!(
        "📊 Daily progress: {:.0}/{} kcal ({}%), {:.0} kcal remaining",
        progress.total_calories,
        progress.calorie_target(),
        progress.percentage(),
        progress.remaining_calories()
    );

    if cli.json {
        let logs = meal_handler.food_logs(&cli.user).await;
        println!("{}", serde_json::to_string_pretty(&logs)?);
    }

    Ok(())
}
