//! Query expansion: map the user's free-text interest list onto canonical
//! categories, widen the food alias, and inject a meal-anchored Restaurant
//! when the trip window overlaps lunch or dinner.

use crate::config::PlannerConfig;
use crate::models::PoiCategory;
use chrono::{Duration, NaiveDateTime};

/// Alias shown in the UI that stands for both food categories.
const FOOD_ALIAS: &str = "food & local flavours";

#[derive(Debug, Clone)]
pub struct ExpandedQuery {
    /// Ordered, deduplicated category list; one semantic search runs per entry.
    pub categories: Vec<PoiCategory>,
    /// True when Restaurant was injected for a meal window (not user-chosen).
    pub meal_anchor: bool,
    /// Concrete lunch/dinner windows that overlap the trip, on the trip date.
    pub meal_windows: Vec<(NaiveDateTime, NaiveDateTime)>,
}

pub fn expand_query(
    raw_query: &str,
    customer_like: bool,
    current_time: Option<NaiveDateTime>,
    budget_minutes: f64,
    config: &PlannerConfig,
) -> ExpandedQuery {
    let mut categories: Vec<PoiCategory> = Vec::new();
    let mut push = |cat: PoiCategory, categories: &mut Vec<PoiCategory>| {
        if !categories.contains(&cat) {
            categories.push(cat);
        }
    };

    for token in raw_query.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token.to_lowercase() == FOOD_ALIAS {
            push(PoiCategory::CafeBakery, &mut categories);
            push(PoiCategory::Restaurant, &mut categories);
        } else if let Ok(cat) = token.parse::<PoiCategory>() {
            push(cat, &mut categories);
        }
    }

    // A purely food-driven query from a returning customer also gets culture.
    let food_only = categories.len() == 2
        && categories.contains(&PoiCategory::CafeBakery)
        && categories.contains(&PoiCategory::Restaurant);
    if food_only && customer_like {
        push(PoiCategory::CultureHeritage, &mut categories);
        tracing::debug!("customer_like food-only query: appended Culture & heritage");
    }

    // Meal-time injection
    let mut meal_anchor = false;
    let mut meal_windows = Vec::new();

    if let Some(start) = current_time {
        let end = start + Duration::seconds((budget_minutes * 60.0) as i64);
        let date = start.date();

        for (open, close) in [config.lunch_window, config.dinner_window] {
            let window = (date.and_time(open), date.and_time(close));
            if start.max(window.0) < end.min(window.1) {
                meal_windows.push(window);
            }
        }

        if !meal_windows.is_empty() && !categories.contains(&PoiCategory::Restaurant) {
            categories.push(PoiCategory::Restaurant);
            meal_anchor = true;
            tracing::info!(
                windows = meal_windows.len(),
                "Trip overlaps a meal window: injected meal-anchored Restaurant"
            );
        }
    }

    ExpandedQuery {
        categories,
        meal_anchor,
        meal_windows,
    }
}
