// ABOUTME: Mealie API wire models for recipes, meal plans, and shopping lists
// ABOUTME: camelCase serde mappings mirroring the Mealie REST schema
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

//! Serde models for the subset of the Mealie API this server consumes.
//! Unknown fields are ignored so Mealie upgrades do not break deserialization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Meal slot types accepted by Mealie meal plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Side,
    Snack,
}

impl Default for MealType {
    fn default() -> Self {
        Self::Dinner
    }
}

/// Recipe tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub slug: String,
    pub name: String,
}

/// Recipe category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub slug: String,
    pub name: String,
}

/// Recipe ingredient line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIngredient {
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<serde_json::Value>,
    #[serde(default)]
    pub food: Option<serde_json::Value>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

/// Recipe instruction step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeInstruction {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub text: String,
}

/// Recipe nutrition information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeNutrition {
    #[serde(default)]
    pub calories: Option<String>,
    #[serde(default)]
    pub fat_content: Option<String>,
    #[serde(default)]
    pub protein_content: Option<String>,
    #[serde(default)]
    pub carbohydrate_content: Option<String>,
    #[serde(default)]
    pub fiber_content: Option<String>,
    #[serde(default)]
    pub sodium_content: Option<String>,
    #[serde(default)]
    pub sugar_content: Option<String>,
}

/// Summary of a recipe for list views
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<serde_json::Value>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub recipe_category: Vec<Category>,
    #[serde(default)]
    pub total_time: Option<String>,
    #[serde(default)]
    pub prep_time: Option<String>,
    #[serde(default)]
    pub cook_time: Option<String>,
    #[serde(default)]
    pub rating: Option<i64>,
}

/// Full recipe details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    #[serde(default)]
    pub recipe_yield: Option<String>,
    #[serde(default)]
    pub recipe_ingredient: Vec<RecipeIngredient>,
    #[serde(default)]
    pub recipe_instructions: Vec<RecipeInstruction>,
    #[serde(default)]
    pub nutrition: Option<RecipeNutrition>,
    #[serde(default, rename = "orgURL")]
    pub org_url: Option<String>,
}

/// A single meal plan entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanEntry {
    pub id: i64,
    pub date: NaiveDate,
    pub entry_type: MealType,
    #[serde(default)]
    pub recipe_id: Option<String>,
    #[serde(default)]
    pub recipe: Option<RecipeSummary>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Request body for creating a meal plan entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanCreate {
    pub date: NaiveDate,
    pub entry_type: MealType,
    pub recipe_id: String,
}

/// An item in a shopping list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListItem {
    pub id: String,
    #[serde(default)]
    pub shopping_list_id: Option<String>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub is_food: bool,
}

/// Summary of a shopping list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingListSummary {
    pub id: String,
    pub name: String,
}

/// Full shopping list with items
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub list_items: Vec<ShoppingListItem>,
}

/// Request body for adding a shopping list item
#[derive(Debug, Clone, Serialize)]
pub struct ShoppingListItemCreate {
    pub note: String,
    pub quantity: f64,
    pub checked: bool,
}
