use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{DailyProgress, FoodLog, Goal, NutritionEstimate};
use crate::services::{AnalysisError, ImageAnalyzer, ImagePayload};

/// Result of logging one meal: the stored entry and the day so far
#[derive(Debug, Clone)]
pub struct MealSummary {
    pub log: FoodLog,
    pub progress: DailyProgress,
}

/// Analyzes meal photos and keeps each user's food log in memory,
/// newest entry first.
pub struct MealHandler {
    analyzer: Arc<ImageAnalyzer>,
    logs: RwLock<HashMap<String, Vec<FoodLog>>>,
}

impl MealHandler {
    pub fn new(analyzer: Arc<ImageAnalyzer>) -> Self {
        Self {
            analyzer,
            logs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn analyze(&self, image: &ImagePayload) -> Result<NutritionEstimate, AnalysisError> {
        self.analyzer.analyze_image(image).await
    }

    /// Stores a confirmed estimate for the user and returns today's progress
    pub async fn add_log(
        &self,
        user_id: &str,
        goal: Option<Goal>,
        nutrition: NutritionEstimate,
        image_url: Option<String>,
    ) -> MealSummary {
        let now = Utc::now();
        let log = FoodLog::new(user_id, nutrition, image_url, now);

        let mut logs = self.logs.write().await;
        let user_logs = logs.entry(user_id.to_string()).or_default();
        user_logs.insert(0, log.clone());

        let progress = DailyProgress::from_logs(user_logs, goal, now.date_naive());
        log::info!(
            "✅ Meal logged for {}: {} ({:.0} kcal), today {:.0}/{} kcal",
            user_id,
            log.nutrition.food_name,
            log.nutrition.calories,
            progress.total_calories,
            progress.calorie_target()
        );

        MealSummary { log, progress }
    }

    pub async fn food_logs(&self, user_id: &str) -> Vec<FoodLog> {
        self.logs
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn daily_progress(&self, user_id: &str, goal: Option<Goal>) -> DailyProgress {
        let logs = self.food_logs(user_id).await;
        DailyProgress::from_logs(&logs, goal, Utc::now().date_naive())
    }

    /// Analyzes and logs a meal photo, returning the text to show the user.
    /// Non-food pictures are reported but not logged.
    pub async fn handle_food_image(
        &self,
        user_id: &str,
        goal: Option<Goal>,
        image: &ImagePayload,
        image_url: Option<String>,
    ) -> String {
        let estimate = match self.analyze(image).await {
            Ok(estimate) => estimate,
            Err(e) => {
                log::error!("Image analysis error: {}", e);
                if let Some(cause) = e.last_cause() {
                    log::debug!("Last provider error: {}", cause);
                }
                return format!("❌ {}", e);
            }
        };

        if !estimate.is_food() {
            log::warn!("⚠️ Image from {} is not food, skipping log", user_id);
            return "🤔 That doesn't look like food. Try another photo.".to_string();
        }

        let summary = self.add_log(user_id, goal, estimate, image_url).await;
        format_meal_summary(&summary)
    }
}

pub fn format_meal_summary(summary: &MealSummary) -> String {
    let n = &summary.log.nutrition;
    let p = &summary.progress;

    format!(
        "✅ {} logged\n\
         🔥 {:.0} kcal | 🥩 {:.1} g protein | 🍞 {:.1} g carbs | 🧈 {:.1} g fat\n\n\
         📊 Today: {:.0}/{} kcal ({}%, {} meal(s))\n\
         {}",
        n.food_name,
        n.calories,
        n.protein,
        n.carbs,
        n.fat,
        p.total_calories,
        p.calorie_target(),
        p.percentage(),
        p.meals_count,
        p.motivational_message()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;
    use crate::services::analyzer::tests::{ScriptedProvider, APPLE_JSON};

    const NOT_FOOD_JSON: &str =
        r#"{"foodName":"Not a food item","calories":0,"protein":0,"carbs":0,"fat":0}"#;

    fn handler(provider: ScriptedProvider) -> MealHandler {
        let config = AnalyzerConfig::new(vec!["k1".to_string()]);
        let analyzer = ImageAnalyzer::new(&config, Arc::new(provider));
        MealHandler::new(Arc::new(analyzer))
    }

    fn image() -> ImagePayload {
        ImagePayload::from_data_url("data:image/jpeg;base64,/9j/4AAQ")
    }

    #[tokio::test]
    async fn test_food_image_is_logged() {
        let handler = handler(ScriptedProvider::new().script("k1", vec![Ok(APPLE_JSON), Ok(APPLE_JSON)]));

        let first = handler
            .handle_food_image("user_1", Some(Goal::LoseWeight), &image(), None)
            .await;
        assert!(first.contains("apple logged"));
        assert!(first.contains("95/2000 kcal"));

        let second = handler
            .handle_food_image("user_1", Some(Goal::LoseWeight), &image(), Some("img.jpg".to_string()))
            .await;
        assert!(second.contains("190/2000 kcal"));
        assert!(second.contains("2 meal(s)"));

        let logs = handler.food_logs("user_1").await;
        assert_eq!(logs.len(), 2);
        // newest first
        assert_eq!(logs[0].image_url.as_deref(), Some("img.jpg"));
        assert!(handler.food_logs("someone_else").await.is_empty());
    }

    #[tokio::test]
    async fn test_not_food_is_not_logged() {
        let handler = handler(ScriptedProvider::new().script("k1", vec![Ok(NOT_FOOD_JSON)]));

        let reply = handler.handle_food_image("user_1", None, &image(), None).await;

        assert!(reply.contains("doesn't look like food"));
        assert!(handler.food_logs("user_1").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_shows_user_message() {
        let handler = handler(ScriptedProvider::new().script("k1", vec![Err("API key not valid")]));

        let reply = handler.handle_food_image("user_1", None, &image(), None).await;

        assert_eq!(
            reply,
            "❌ unable to analyze image after exhausting all available credentials"
        );
        assert!(handler.food_logs("user_1").await.is_empty());
    }

    #[tokio::test]
    async fn test_daily_progress_defaults_target() {
        let handler = handler(ScriptedProvider::new().script("k1", vec![Ok(APPLE_JSON)]));
        let estimate = handler.analyze(&image()).await.unwrap();
        handler.add_log("user_1", None, estimate, None).await;

        let progress = handler.daily_progress("user_1", None).await;
        assert_eq!(progress.meals_count, 1);
        assert_eq!(progress.calorie_target(), 2000);

        let gaining = handler.daily_progress("user_1", Some(Goal::GainWeight)).await;
        assert_eq!(gaining.calorie_target(), 3000);
    }
}
