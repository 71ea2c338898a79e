use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Name the model returns when the picture is not food
pub const NOT_FOOD_NAME: &str = "Not a food item";

/// Calorie target used before the user has picked a goal
pub const DEFAULT_CALORIE_TARGET: u32 = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionEstimate {
    pub food_name: String,
    pub calories: f64, // kcal
    pub protein: f64,  // g
    pub carbs: f64,    // g
    pub fat: f64,      // g
}

impl NutritionEstimate {
    pub fn is_food(&self) -> bool {
        self.food_name.trim() != NOT_FOOD_NAME
    }

    /// Checks the invariants serde cannot express: a non-empty name and
    /// finite, non-negative nutrient values.
    pub fn validate(&self) -> Result<(), String> {
        if self.food_name.trim().is_empty() {
            return Err("foodName is empty".to_string());
        }

        let values = [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fat", self.fat),
        ];
        for (field, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", field, value));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Goal {
    LoseWeight,
    MaintainWeight,
    GainWeight,
}

impl Goal {
    pub fn calorie_target(&self) -> u32 {
        match self {
            Goal::LoseWeight => 2000,
            Goal::MaintainWeight => 2500,
            Goal::GainWeight => 3000,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Goal::LoseWeight => "Lose Weight",
            Goal::MaintainWeight => "Maintain Weight",
            Goal::GainWeight => "Gain Weight",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Goal::LoseWeight => "Create a calorie deficit to shed pounds.",
            Goal::MaintainWeight => "Keep your current weight with a balanced diet.",
            Goal::GainWeight => "Build muscle and mass with a calorie surplus.",
        }
    }
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Goal::LoseWeight => "lose-weight",
            Goal::MaintainWeight => "maintain-weight",
            Goal::GainWeight => "gain-weight",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Goal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");

        match normalized.as_str() {
            "lose-weight" | "lose" => Ok(Goal::LoseWeight),
            "maintain-weight" | "maintain" => Ok(Goal::MaintainWeight),
            "gain-weight" | "gain" => Ok(Goal::GainWeight),
            _ => Err(format!(
                "unknown goal '{}' (expected lose-weight, maintain-weight or gain-weight)",
                s
            )),
        }
    }
}

/// An estimate the caller has stamped with identity, owner and time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodLog {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub nutrition: NutritionEstimate,
}

impl FoodLog {
    pub fn new(
        user_id: &str,
        nutrition: NutritionEstimate,
        image_url: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("log_{}", created_at.timestamp_millis()),
            user_id: user_id.to_string(),
            created_at,
            image_url,
            nutrition,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub goal: Option<Goal>,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub meals_count: usize,
}

impl DailyProgress {
    pub fn from_logs(logs: &[FoodLog], goal: Option<Goal>, date: NaiveDate) -> Self {
        let mut progress = DailyProgress {
            date,
            goal,
            total_calories: 0.0,
            total_protein: 0.0,
            total_carbs: 0.0,
            total_fat: 0.0,
            meals_count: 0,
        };

        for log in logs.iter().filter(|l| l.created_at.date_naive() == date) {
            progress.total_calories += log.nutrition.calories;
            progress.total_protein += log.nutrition.protein;
            progress.total_carbs += log.nutrition.carbs;
            progress.total_fat += log.nutrition.fat;
            progress.meals_count += 1;
        }

        progress
    }

    pub fn calorie_target(&self) -> u32 {
        self.goal
            .map(|g| g.calorie_target())
            .unwrap_or(DEFAULT_CALORIE_TARGET)
    }

    pub fn remaining_calories(&self) -> f64 {
        (self.calorie_target() as f64 - self.total_calories).max(0.0)
    }

    /// Rounded share of the calorie target consumed, capped at 150
    pub fn percentage(&self) -> u32 {
        ((self.total_calories / self.calorie_target() as f64) * 100.0)
            .round()
            .clamp(0.0, 150.0) as u32
    }

    pub fn motivational_message(&self) -> &'static str {
        match self.percentage() {
            0..=24 => "Let's get started on a great day!",
            25..=74 => "You're doing great, keep it up!",
            75..=100 => "Almost there! Finishing strong.",
            _ => "Goal reached! Amazing work.",
        }
    }
}
