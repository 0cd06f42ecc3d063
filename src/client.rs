// ABOUTME: Mealie HTTP client bound to exactly one API credential
// ABOUTME: Factory caches clients by credential value so sharing never crosses a tenant
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

//! # Mealie Client
//!
//! [`MealieClient`] issues calls against the Mealie REST API with a bearer
//! token fixed at construction; the binding is immutable for the life of the
//! client. [`MealieClientFactory`] is the only way the rest of the server
//! obtains a client: it takes a resolved credential (never a raw identity)
//! and may serve a cached instance, keyed by the exact credential value.
//!
//! Credential validity is only discovered when Mealie rejects a call (401 →
//! [`crate::errors::ErrorCode::BackendAuthFailed`]); construction fails only
//! on transport-level problems such as a malformed base URL.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::NaiveDate;
use dashmap::DashMap;
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{
    Category, MealPlanCreate, MealPlanEntry, MealType, Recipe, RecipeSummary, ShoppingList,
    ShoppingListItem, ShoppingListItemCreate, ShoppingListSummary, Tag,
};
use crate::tokens::redact;

/// Configured timeout values for the shared client
static CLIENT_TIMEOUTS: OnceLock<(u64, u64)> = OnceLock::new();

/// Global shared HTTP client with connection pooling
static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

/// Initialize the shared HTTP client timeout configuration.
///
/// Call once at server startup before the first client is created. If not
/// called, defaults from [`crate::constants::defaults`] are used.
pub fn initialize_shared_client(timeout_secs: u64, connect_timeout_secs: u64) {
    let _ = CLIENT_TIMEOUTS.set((timeout_secs, connect_timeout_secs));
}

fn shared_client() -> &'static Client {
    SHARED_CLIENT.get_or_init(|| {
        let (timeout, connect_timeout) = CLIENT_TIMEOUTS.get().copied().unwrap_or((
            crate::constants::defaults::MEALIE_TIMEOUT_SECS,
            crate::constants::defaults::MEALIE_CONNECT_TIMEOUT_SECS,
        ));

        ClientBuilder::new()
            .timeout(Duration::from_secs(timeout))
            .connect_timeout(Duration::from_secs(connect_timeout))
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}

/// Async client for the Mealie API, bound to one bearer credential
pub struct MealieClient {
    http: Client,
    base_url: String,
    token: String,
}

impl MealieClient {
    fn new(base_url: String, token: String) -> Self {
        Self {
            http: shared_client().clone(),
            base_url,
            token,
        }
    }

    /// The credential this client is bound to (exact value, for cache keys)
    pub(crate) fn credential(&self) -> &str {
        &self.token
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(String, String)]>,
        body: Option<&Value>,
    ) -> AppResult<Value> {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json");

        if let Some(query) = query {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                AppError::backend_unavailable(format!("cannot connect to Mealie at {}", self.base_url))
                    .with_source(e)
            } else if e.is_timeout() {
                AppError::backend_unavailable("request to Mealie timed out").with_source(e)
            } else {
                AppError::backend_error("request to Mealie failed").with_source(e)
            }
        })?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                Err(AppError::backend_auth_failed("invalid or expired Mealie API token"))
            }
            StatusCode::NOT_FOUND => Err(AppError::not_found(path.to_owned())),
            StatusCode::NO_CONTENT => Ok(Value::Object(serde_json::Map::new())),
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| AppError::serialization("malformed JSON from Mealie").with_source(e)),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(AppError::backend_error(format!("Mealie returned HTTP {status}: {text}")))
            }
        }
    }

    /// Unwrap Mealie's paginated envelope (`{"items": [...]}`) when present
    fn unwrap_items(value: Value) -> Value {
        match value {
            Value::Object(mut map) => map.remove("items").unwrap_or(Value::Array(Vec::new())),
            other => other,
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(value: Value) -> AppResult<T> {
        serde_json::from_value(value)
            .map_err(|e| AppError::serialization("unexpected Mealie response shape").with_source(e))
    }

    // ── Recipes ─────────────────────────────────────────────────────────

    /// Search recipes with optional text, tag, and category filters
    ///
    /// # Errors
    /// Returns a backend error if Mealie is unreachable or rejects the call.
    pub async fn search_recipes(
        &self,
        query: Option<&str>,
        tags: &[String],
        categories: &[String],
        per_page: u64,
    ) -> AppResult<Vec<RecipeSummary>> {
        let mut params = vec![
            ("page".to_owned(), "1".to_owned()),
            ("perPage".to_owned(), per_page.to_string()),
        ];
        if let Some(query) = query {
            params.push(("search".to_owned(), query.to_owned()));
        }
        for tag in tags {
            params.push(("tags".to_owned(), tag.clone()));
        }
        for category in categories {
            params.push(("categories".to_owned(), category.clone()));
        }

        let result = self
            .request(Method::GET, "/recipes", Some(&params), None)
            .await?;
        Self::parse(Self::unwrap_items(result))
    }

    /// Get full recipe details by slug or id
    ///
    /// # Errors
    /// Returns `ResourceNotFound` if the recipe does not exist.
    pub async fn get_recipe(&self, slug: &str) -> AppResult<Recipe> {
        let result = self
            .request(Method::GET, &format!("/recipes/{slug}"), None, None)
            .await
            .map_err(|e| match e.code {
                crate::errors::ErrorCode::ResourceNotFound => {
                    AppError::not_found(format!("recipe '{slug}'"))
                }
                _ => e,
            })?;
        Self::parse(result)
    }

    /// Get all available tags
    ///
    /// # Errors
    /// Returns a backend error if Mealie is unreachable or rejects the call.
    pub async fn list_tags(&self) -> AppResult<Vec<Tag>> {
        let result = self
            .request(Method::GET, "/organizers/tags", None, None)
            .await?;
        Self::parse(Self::unwrap_items(result))
    }

    /// Get all available categories
    ///
    /// # Errors
    /// Returns a backend error if Mealie is unreachable or rejects the call.
    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let result = self
            .request(Method::GET, "/organizers/categories", None, None)
            .await?;
        Self::parse(Self::unwrap_items(result))
    }

    // ── Meal plans ──────────────────────────────────────────────────────

    /// Get meal plan entries for a date range
    ///
    /// # Errors
    /// Returns a backend error if Mealie is unreachable or rejects the call.
    pub async fn get_meal_plan(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<MealPlanEntry>> {
        let params = vec![
            ("start_date".to_owned(), start_date.to_string()),
            ("end_date".to_owned(), end_date.to_string()),
        ];
        let result = self
            .request(Method::GET, "/households/mealplans", Some(&params), None)
            .await?;
        Self::parse(Self::unwrap_items(result))
    }

    /// Create a meal plan entry. `recipe_ref` may be a recipe UUID or a slug;
    /// slugs are resolved to ids before posting.
    ///
    /// # Errors
    /// Returns `ResourceNotFound` if a slug does not resolve to a recipe.
    pub async fn create_meal_plan_entry(
        &self,
        date: NaiveDate,
        recipe_ref: &str,
        entry_type: MealType,
    ) -> AppResult<MealPlanEntry> {
        let recipe_id = if Uuid::parse_str(recipe_ref).is_ok() {
            recipe_ref.to_owned()
        } else {
            self.get_recipe(recipe_ref).await?.summary.id
        };

        let body = serde_json::to_value(MealPlanCreate {
            date,
            entry_type,
            recipe_id,
        })
        .map_err(|e| AppError::serialization("failed to encode meal plan entry").with_source(e))?;

        let result = self
            .request(Method::POST, "/households/mealplans", None, Some(&body))
            .await?;
        Self::parse(result)
    }

    /// Delete a meal plan entry by id
    ///
    /// # Errors
    /// Returns `ResourceNotFound` if the entry does not exist.
    pub async fn delete_meal_plan_entry(&self, entry_id: i64) -> AppResult<()> {
        self.request(
            Method::DELETE,
            &format!("/households/mealplans/{entry_id}"),
            None,
            None,
        )
        .await
        .map_err(|e| match e.code {
            crate::errors::ErrorCode::ResourceNotFound => {
                AppError::not_found(format!("meal plan entry '{entry_id}'"))
            }
            _ => e,
        })?;
        Ok(())
    }

    // ── Shopping lists ──────────────────────────────────────────────────

    /// Get all shopping lists
    ///
    /// # Errors
    /// Returns a backend error if Mealie is unreachable or rejects the call.
    pub async fn get_shopping_lists(&self) -> AppResult<Vec<ShoppingListSummary>> {
        let result = self
            .request(Method::GET, "/households/shopping/lists", None, None)
            .await?;
        Self::parse(Self::unwrap_items(result))
    }

    /// Get a shopping list with its items
    ///
    /// # Errors
    /// Returns `ResourceNotFound` if the list does not exist.
    pub async fn get_shopping_list(&self, list_id: &str) -> AppResult<ShoppingList> {
        let result = self
            .request(
                Method::GET,
                &format!("/households/shopping/lists/{list_id}"),
                None,
                None,
            )
            .await
            .map_err(|e| match e.code {
                crate::errors::ErrorCode::ResourceNotFound => {
                    AppError::not_found(format!("shopping list '{list_id}'"))
                }
                _ => e,
            })?;
        Self::parse(result)
    }

    /// The id of the first available shopping list
    ///
    /// # Errors
    /// Returns `ResourceNotFound` when no shopping lists exist.
    pub async fn first_shopping_list_id(&self) -> AppResult<String> {
        let lists = self.get_shopping_lists().await?;
        lists
            .into_iter()
            .next()
            .map(|list| list.id)
            .ok_or_else(|| AppError::not_found("shopping list"))
    }

    /// Add a free-text item to a shopping list
    ///
    /// # Errors
    /// Returns a backend error if Mealie is unreachable or rejects the call.
    pub async fn add_shopping_list_item(
        &self,
        list_id: &str,
        note: &str,
        quantity: f64,
    ) -> AppResult<ShoppingListItem> {
        let body = serde_json::to_value(ShoppingListItemCreate {
            note: note.to_owned(),
            quantity,
            checked: false,
        })
        .map_err(|e| AppError::serialization("failed to encode shopping item").with_source(e))?;

        let result = self
            .request(
                Method::POST,
                &format!("/households/shopping/lists/{list_id}/items"),
                None,
                Some(&body),
            )
            .await?;
        Self::parse(result)
    }

    /// Remove an item from a shopping list
    ///
    /// # Errors
    /// Returns a backend error if Mealie is unreachable or rejects the call.
    pub async fn delete_shopping_list_item(&self, list_id: &str, item_id: &str) -> AppResult<()> {
        self.request(
            Method::DELETE,
            &format!("/households/shopping/lists/{list_id}/items/{item_id}"),
            None,
            None,
        )
        .await?;
        Ok(())
    }

    /// Remove all checked items from a shopping list, returning the count
    ///
    /// # Errors
    /// Returns a backend error if Mealie is unreachable or rejects the call.
    pub async fn clear_checked_items(&self, list_id: &str) -> AppResult<usize> {
        let list = self.get_shopping_list(list_id).await?;
        let checked: Vec<String> = list
            .list_items
            .into_iter()
            .filter(|item| item.checked)
            .map(|item| item.id)
            .collect();

        let count = checked.len();
        for item_id in checked {
            self.delete_shopping_list_item(list_id, &item_id).await?;
        }
        Ok(count)
    }
}

/// Builds Mealie clients bound to resolved credentials. Instances are cached
/// by the exact credential value; a cached client is never served for a
/// different credential than requested, so pooling can only ever be shared by
/// concurrent calls of the same tenant.
pub struct MealieClientFactory {
    base_url: String,
    cache: DashMap<String, Arc<MealieClient>>,
}

// Manual impl: cached clients hold bearer tokens, which must not appear in
// debug output.
impl std::fmt::Debug for MealieClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MealieClientFactory")
            .field("base_url", &self.base_url)
            .field("cached_clients", &self.cache.len())
            .finish()
    }
}

impl MealieClientFactory {
    /// Create a factory for the given Mealie base URL
    ///
    /// # Errors
    /// Returns `BackendUnavailable` if the base URL is malformed. Credential
    /// validity is not checked here; Mealie reports it at call time.
    pub fn new(base_url: &str) -> AppResult<Self> {
        let trimmed = base_url.trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| {
            AppError::backend_unavailable(format!("invalid Mealie base URL '{base_url}'"))
                .with_source(e)
        })?;

        Ok(Self {
            base_url: trimmed.to_owned(),
            cache: DashMap::new(),
        })
    }

    /// Get a client bound to `credential`, reusing a cached instance when one
    /// exists for that exact credential value
    #[must_use]
    pub fn client_for(&self, credential: &str) -> Arc<MealieClient> {
        let client = self
            .cache
            .entry(credential.to_owned())
            .or_insert_with(|| {
                debug!(token = %redact(credential), "creating Mealie client");
                Arc::new(MealieClient::new(self.base_url.clone(), credential.to_owned()))
            })
            .clone();

        debug_assert_eq!(client.credential(), credential);
        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_rejects_malformed_base_url() {
        let err = MealieClientFactory::new("not a url").unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::BackendUnavailable);
    }

    #[test]
    fn test_factory_caches_by_exact_credential() {
        let factory = MealieClientFactory::new("http://localhost:9000/api").unwrap();

        let a1 = factory.client_for("tokA");
        let a2 = factory.client_for("tokA");
        let b = factory.client_for("tokB");

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(a1.credential(), "tokA");
        assert_eq!(b.credential(), "tokB");
    }

    #[test]
    fn test_client_binding_is_immutable() {
        let factory = MealieClientFactory::new("http://localhost:9000/api").unwrap();
        let client = factory.client_for("tokA");
        // A second tenant asking for its own credential never mutates the first
        let _other = factory.client_for("tokB");
        assert_eq!(client.credential(), "tokA");
    }

    #[test]
    fn test_unwrap_items_handles_paginated_and_plain() {
        let paginated = serde_json::json!({"page": 1, "items": [{"id": "x"}]});
        assert_eq!(
            MealieClient::unwrap_items(paginated),
            serde_json::json!([{"id": "x"}])
        );

        let plain = serde_json::json!([1, 2, 3]);
        assert_eq!(MealieClient::unwrap_items(plain), serde_json::json!([1, 2, 3]));
    }
}
