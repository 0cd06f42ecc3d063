// ABOUTME: Routes tools/call invocations to typed Mealie client calls
// ABOUTME: Parses caller arguments and shapes results for assistant consumption
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::MealieClient;
use crate::constants::limits;
use crate::errors::{AppError, AppResult};
use crate::models::MealType;

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> AppResult<T> {
    serde_json::from_value(args)
        .map_err(|e| AppError::invalid_input(format!("invalid tool arguments: {e}")))
}

#[derive(Debug, Deserialize)]
struct SearchRecipesArgs {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GetRecipeArgs {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct GetMealPlanArgs {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct CreateMealPlanArgs {
    date: NaiveDate,
    recipe_slug: String,
    #[serde(default)]
    meal_type: MealType,
}

#[derive(Debug, Deserialize)]
struct DeleteMealPlanArgs {
    entry_id: i64,
}

#[derive(Debug, Deserialize)]
struct ListIdArgs {
    #[serde(default)]
    list_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddToShoppingListArgs {
    items: Vec<String>,
    #[serde(default)]
    list_id: Option<String>,
}

/// Execute a named tool against the given tenant-bound client
///
/// # Errors
/// Returns `InvalidInput` for unknown tools or malformed arguments, and
/// propagates backend errors from the client.
pub async fn call(client: &MealieClient, name: &str, args: Value) -> AppResult<Value> {
    match name {
        "search_recipes" => search_recipes(client, parse_args(args)?).await,
        "get_recipe" => get_recipe(client, parse_args(args)?).await,
        "list_tags" => list_tags(client).await,
        "list_categories" => list_categories(client).await,
        "get_meal_plan" => get_meal_plan(client, parse_args(args)?).await,
        "create_meal_plan_entry" => create_meal_plan_entry(client, parse_args(args)?).await,
        "delete_meal_plan_entry" => delete_meal_plan_entry(client, parse_args(args)?).await,
        "get_shopping_lists" => get_shopping_lists(client).await,
        "get_shopping_list" => get_shopping_list(client, parse_args(args)?).await,
        "add_to_shopping_list" => add_to_shopping_list(client, parse_args(args)?).await,
        "clear_checked_items" => clear_checked_items(client, parse_args(args)?).await,
        other => Err(AppError::invalid_input(format!("unknown tool: {other}"))),
    }
}

async fn search_recipes(client: &MealieClient, args: SearchRecipesArgs) -> AppResult<Value> {
    let limit = args
        .limit
        .unwrap_or(limits::DEFAULT_SEARCH_LIMIT)
        .min(limits::MAX_SEARCH_LIMIT);

    let recipes = client
        .search_recipes(args.query.as_deref(), &args.tags, &args.categories, limit)
        .await?;

    let summaries: Vec<Value> = recipes
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "slug": r.slug,
                "name": r.name,
                "description": r.description,
                "tags": r.tags.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "categories": r.recipe_category.iter().map(|c| &c.name).collect::<Vec<_>>(),
                "total_time": r.total_time,
                "rating": r.rating,
            })
        })
        .collect();

    Ok(Value::Array(summaries))
}

async fn get_recipe(client: &MealieClient, args: GetRecipeArgs) -> AppResult<Value> {
    let recipe = client.get_recipe(&args.slug).await?;
    serde_json::to_value(recipe)
        .map_err(|e| AppError::serialization("failed to encode recipe").with_source(e))
}

async fn list_tags(client: &MealieClient) -> AppResult<Value> {
    let tags = client.list_tags().await?;
    serde_json::to_value(tags)
        .map_err(|e| AppError::serialization("failed to encode tags").with_source(e))
}

async fn list_categories(client: &MealieClient) -> AppResult<Value> {
    let categories = client.list_categories().await?;
    serde_json::to_value(categories)
        .map_err(|e| AppError::serialization("failed to encode categories").with_source(e))
}

async fn get_meal_plan(client: &MealieClient, args: GetMealPlanArgs) -> AppResult<Value> {
    if args.end_date < args.start_date {
        return Err(AppError::invalid_input("end_date precedes start_date"));
    }

    let entries = client.get_meal_plan(args.start_date, args.end_date).await?;
    let shaped: Vec<Value> = entries
        .iter()
        .map(|e| {
            json!({
                "id": e.id,
                "date": e.date,
                "meal_type": e.entry_type,
                "recipe": e.recipe.as_ref().map(|r| json!({"slug": r.slug, "name": r.name})),
                "title": e.title,
            })
        })
        .collect();
    Ok(Value::Array(shaped))
}

async fn create_meal_plan_entry(client: &MealieClient, args: CreateMealPlanArgs) -> AppResult<Value> {
    let entry = client
        .create_meal_plan_entry(args.date, &args.recipe_slug, args.meal_type)
        .await?;
    serde_json::to_value(entry)
        .map_err(|e| AppError::serialization("failed to encode meal plan entry").with_source(e))
}

async fn delete_meal_plan_entry(client: &MealieClient, args: DeleteMealPlanArgs) -> AppResult<Value> {
    client.delete_meal_plan_entry(args.entry_id).await?;
    Ok(json!({
        "success": true,
        "message": format!("Deleted meal plan entry {}", args.entry_id),
    }))
}

async fn get_shopping_lists(client: &MealieClient) -> AppResult<Value> {
    let lists = client.get_shopping_lists().await?;
    serde_json::to_value(lists)
        .map_err(|e| AppError::serialization("failed to encode shopping lists").with_source(e))
}

async fn resolve_list_id(client: &MealieClient, list_id: Option<String>) -> AppResult<String> {
    match list_id {
        Some(id) => Ok(id),
        None => client.first_shopping_list_id().await,
    }
}

async fn get_shopping_list(client: &MealieClient, args: ListIdArgs) -> AppResult<Value> {
    let list_id = resolve_list_id(client, args.list_id).await?;
    let list = client.get_shopping_list(&list_id).await?;
    serde_json::to_value(list)
        .map_err(|e| AppError::serialization("failed to encode shopping list").with_source(e))
}

async fn add_to_shopping_list(client: &MealieClient, args: AddToShoppingListArgs) -> AppResult<Value> {
    if args.items.is_empty() {
        return Err(AppError::invalid_input("items must not be empty"));
    }

    let list_id = resolve_list_id(client, args.list_id).await?;
    let mut added = Vec::with_capacity(args.items.len());
    for note in &args.items {
        let item = client.add_shopping_list_item(&list_id, note, 1.0).await?;
        added.push(item.display.unwrap_or_else(|| note.clone()));
    }

    Ok(json!({
        "list_id": list_id,
        "added": added.len(),
        "items": added,
    }))
}

async fn clear_checked_items(client: &MealieClient, args: ListIdArgs) -> AppResult<Value> {
    let list_id = resolve_list_id(client, args.list_id).await?;
    let removed = client.clear_checked_items(&list_id).await?;
    Ok(json!({
        "list_id": list_id,
        "removed": removed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_args_defaults() {
        let args: SearchRecipesArgs = parse_args(json!({})).unwrap();
        assert!(args.query.is_none());
        assert!(args.tags.is_empty());
        assert!(args.limit.is_none());
    }

    #[test]
    fn test_meal_plan_args_parse_iso_dates() {
        let args: GetMealPlanArgs = parse_args(json!({
            "start_date": "2025-03-10",
            "end_date": "2025-03-16"
        }))
        .unwrap();
        assert!(args.start_date < args.end_date);

        let bad: AppResult<GetMealPlanArgs> = parse_args(json!({
            "start_date": "tomorrow",
            "end_date": "2025-03-16"
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_create_meal_plan_defaults_to_dinner() {
        let args: CreateMealPlanArgs = parse_args(json!({
            "date": "2025-03-14",
            "recipe_slug": "spaghetti-carbonara"
        }))
        .unwrap();
        assert_eq!(args.meal_type, MealType::Dinner);
    }

    #[test]
    fn test_missing_required_argument_is_invalid_input() {
        let err: AppResult<GetRecipeArgs> = parse_args(json!({}));
        assert_eq!(
            err.unwrap_err().code,
            crate::errors::ErrorCode::InvalidInput
        );
    }
}
