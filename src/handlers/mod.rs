pub mod meal_handler;

pub use meal_handler::MealHandler;
