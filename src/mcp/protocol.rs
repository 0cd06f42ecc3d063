// ABOUTME: MCP protocol payloads: initialize result, capabilities, and tool schemas
// ABOUTME: The tool surface mirrors the Mealie operations exposed to assistants
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Mealie MCP Contributors

use serde_json::{json, Value};

use crate::constants::limits;
use crate::constants::protocol::{MCP_PROTOCOL_VERSION, SERVER_NAME};

/// Result payload for the MCP `initialize` method
#[must_use]
pub fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "instructions": "You are connected to a personal Mealie recipe library. \
You can search recipes, view full recipe details, manage meal plans, and work \
with shopping lists. Use search_recipes to find recipes, get_recipe for full \
details, create_meal_plan_entry to plan meals, and add_to_shopping_list for \
shopping."
    })
}

/// Result payload for the MCP `tools/list` method
#[must_use]
pub fn tools_list() -> Value {
    json!({ "tools": tool_definitions() })
}

fn tool_definitions() -> Value {
    json!([
        {
            "name": "search_recipes",
            "description": "Search the recipe library with optional text, tag, and category filters. Returns recipe summaries with id, slug, name, description, tags, and timing info.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Text search term to find recipes by name or description"},
                    "tags": {"type": "array", "items": {"type": "string"}, "description": "Filter by tag slugs (e.g. [\"quick\", \"vegetarian\"])"},
                    "categories": {"type": "array", "items": {"type": "string"}, "description": "Filter by category slugs (e.g. [\"dinner\", \"desserts\"])"},
                    "limit": {"type": "integer", "description": "Maximum number of results", "default": limits::DEFAULT_SEARCH_LIMIT, "maximum": limits::MAX_SEARCH_LIMIT}
                }
            }
        },
        {
            "name": "get_recipe",
            "description": "Get full recipe details including ingredients and instructions.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "slug": {"type": "string", "description": "Recipe slug or ID (e.g. \"spaghetti-carbonara\")"}
                },
                "required": ["slug"]
            }
        },
        {
            "name": "list_tags",
            "description": "Get all available tags for filtering recipes.",
            "inputSchema": {"type": "object", "properties": {}}
        },
        {
            "name": "list_categories",
            "description": "Get all available categories for filtering recipes.",
            "inputSchema": {"type": "object", "properties": {}}
        },
        {
            "name": "get_meal_plan",
            "description": "Retrieve meal plan entries for a date range.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "start_date": {"type": "string", "description": "Start date in ISO format (YYYY-MM-DD)"},
                    "end_date": {"type": "string", "description": "End date in ISO format (YYYY-MM-DD)"}
                },
                "required": ["start_date", "end_date"]
            }
        },
        {
            "name": "create_meal_plan_entry",
            "description": "Add a recipe to the meal plan.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "date": {"type": "string", "description": "Date for the meal in ISO format (YYYY-MM-DD)"},
                    "recipe_slug": {"type": "string", "description": "Recipe slug or ID to plan"},
                    "meal_type": {"type": "string", "enum": ["breakfast", "lunch", "dinner", "side", "snack"], "default": "dinner"}
                },
                "required": ["date", "recipe_slug"]
            }
        },
        {
            "name": "delete_meal_plan_entry",
            "description": "Remove an entry from the meal plan.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "entry_id": {"type": "integer", "description": "Meal plan entry ID to delete"}
                },
                "required": ["entry_id"]
            }
        },
        {
            "name": "get_shopping_lists",
            "description": "Get all shopping lists.",
            "inputSchema": {"type": "object", "properties": {}}
        },
        {
            "name": "get_shopping_list",
            "description": "Get items from a specific shopping list. Uses the first available list when no id is given.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "list_id": {"type": "string", "description": "Shopping list ID"}
                }
            }
        },
        {
            "name": "add_to_shopping_list",
            "description": "Add items to a shopping list. Uses the first available list when no id is given.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "items": {"type": "array", "items": {"type": "string"}, "description": "Item descriptions to add (e.g. [\"2 cups flour\", \"1 dozen eggs\"])"},
                    "list_id": {"type": "string", "description": "Target shopping list ID"}
                },
                "required": ["items"]
            }
        },
        {
            "name": "clear_checked_items",
            "description": "Remove all checked items from a shopping list. Uses the first available list when no id is given.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "list_id": {"type": "string", "description": "Shopping list ID"}
                }
            }
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_advertises_tools_capability() {
        let result = initialize_result();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[test]
    fn test_tools_list_covers_full_surface() {
        let list = tools_list();
        let tools = list["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();

        for expected in [
            "search_recipes",
            "get_recipe",
            "list_tags",
            "list_categories",
            "get_meal_plan",
            "create_meal_plan_entry",
            "delete_meal_plan_entry",
            "get_shopping_lists",
            "get_shopping_list",
            "add_to_shopping_list",
            "clear_checked_items",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
        assert_eq!(names.len(), 11);
    }

    #[test]
    fn test_every_tool_has_input_schema() {
        let list = tools_list();
        for tool in list["tools"].as_array().unwrap() {
            assert_eq!(tool["inputSchema"]["type"], "object", "{}", tool["name"]);
        }
    }
}
