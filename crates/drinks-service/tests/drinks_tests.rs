//! Drink menu integration tests.
//!
//! Exercises the public menu and the protected menu-management routes with
//! properly authorized tokens.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use drinks_service::models::{NewDrink, RecipePart};
use drinks_test_utils::TestDrinksServer;
use reqwest::Client;
use serde_json::{json, Value};

const ALL_PERMISSIONS: &[&str] = &[
    "get:drinks-detail",
    "post:drinks",
    "patch:drinks",
    "delete:drinks",
];

fn part(name: &str, color: &str, parts: i64) -> RecipePart {
    RecipePart {
        name: name.to_string(),
        color: color.to_string(),
        parts,
    }
}

fn menu() -> Vec<NewDrink> {
    vec![
        NewDrink {
            title: "Water".to_string(),
            recipe: vec![part("Water", "blue", 1)],
        },
        NewDrink {
            title: "Matcha Latte".to_string(),
            recipe: vec![part("milk", "grey", 1), part("matcha", "green", 3)],
        },
    ]
}

async fn list_menu(server: &TestDrinksServer) -> Result<Value> {
    Ok(reqwest::get(format!("{}/drinks", server.url()))
        .await?
        .json()
        .await?)
}

// =============================================================================
// GET /drinks
// =============================================================================

#[tokio::test]
async fn test_public_menu_hides_ingredient_names() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;

    let body = list_menu(&server).await?;

    assert_eq!(body["success"], true);
    assert_eq!(
        body["drinks"],
        json!([
            {"id": 1, "title": "Water", "recipe": [{"color": "blue", "parts": 1}]},
            {"id": 2, "title": "Matcha Latte", "recipe": [
                {"color": "grey", "parts": 1},
                {"color": "green", "parts": 3}
            ]}
        ])
    );

    Ok(())
}

#[tokio::test]
async fn test_public_menu_ignores_credentials() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;

    let response = Client::new()
        .get(format!("{}/drinks", server.url()))
        .header("Authorization", "Basic garbage")
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    Ok(())
}

// =============================================================================
// GET /drinks-detail
// =============================================================================

#[tokio::test]
async fn test_detail_includes_ingredient_names() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;

    let response = Client::new()
        .get(format!("{}/drinks-detail", server.url()))
        .header("Authorization", server.bearer(&["get:drinks-detail"]))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(
        body["drinks"][1]["recipe"],
        json!([
            {"name": "milk", "color": "grey", "parts": 1},
            {"name": "matcha", "color": "green", "parts": 3}
        ])
    );

    Ok(())
}

// =============================================================================
// POST /drinks
// =============================================================================

#[tokio::test]
async fn test_create_drink() -> Result<()> {
    let server = TestDrinksServer::spawn().await?;

    let response = Client::new()
        .post(format!("{}/drinks", server.url()))
        .header("Authorization", server.bearer(&["post:drinks"]))
        .json(&json!({
            "title": "Flat White",
            "recipe": [
                {"name": "espresso", "color": "brown", "parts": 1},
                {"name": "milk", "color": "white", "parts": 2}
            ]
        }))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["drinks"][0]["id"], 1);
    assert_eq!(body["drinks"][0]["title"], "Flat White");
    assert_eq!(body["drinks"][0]["recipe"][1]["name"], "milk");

    let menu = list_menu(&server).await?;
    assert_eq!(menu["drinks"][0]["title"], "Flat White");

    Ok(())
}

#[tokio::test]
async fn test_create_drink_accepts_single_recipe_object() -> Result<()> {
    let server = TestDrinksServer::spawn().await?;

    let response = Client::new()
        .post(format!("{}/drinks", server.url()))
        .header("Authorization", server.bearer(&["post:drinks"]))
        .json(&json!({
            "title": "Water",
            "recipe": {"name": "water", "color": "blue", "parts": 1}
        }))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(
        body["drinks"][0]["recipe"],
        json!([{"name": "water", "color": "blue", "parts": 1}])
    );

    Ok(())
}

#[tokio::test]
async fn test_create_duplicate_title_is_409() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;

    let response = Client::new()
        .post(format!("{}/drinks", server.url()))
        .header("Authorization", server.bearer(&["post:drinks"]))
        .json(&json!({
            "title": "Water",
            "recipe": [{"name": "water", "color": "blue", "parts": 1}]
        }))
        .send()
        .await?;

    assert_eq!(response.status(), 409);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "conflict");

    Ok(())
}

#[tokio::test]
async fn test_create_blank_title_is_400() -> Result<()> {
    let server = TestDrinksServer::spawn().await?;

    let response = Client::new()
        .post(format!("{}/drinks", server.url()))
        .header("Authorization", server.bearer(&["post:drinks"]))
        .json(&json!({
            "title": "   ",
            "recipe": [{"name": "water", "color": "blue", "parts": 1}]
        }))
        .send()
        .await?;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "bad_request");

    Ok(())
}

#[tokio::test]
async fn test_create_missing_recipe_is_422() -> Result<()> {
    let server = TestDrinksServer::spawn().await?;

    let response = Client::new()
        .post(format!("{}/drinks", server.url()))
        .header("Authorization", server.bearer(&["post:drinks"]))
        .json(&json!({"title": "Mystery"}))
        .send()
        .await?;

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "unprocessable");

    Ok(())
}

#[tokio::test]
async fn test_create_checks_auth_before_body() -> Result<()> {
    let server = TestDrinksServer::spawn().await?;

    let response = Client::new()
        .post(format!("{}/drinks", server.url()))
        .body("not json")
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    Ok(())
}

// =============================================================================
// PATCH /drinks/:id
// =============================================================================

#[tokio::test]
async fn test_update_title_keeps_recipe() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;

    let response = Client::new()
        .patch(format!("{}/drinks/2", server.url()))
        .header("Authorization", server.bearer(&["patch:drinks"]))
        .json(&json!({"title": "Iced Matcha Latte"}))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["drinks"][0]["id"], 2);
    assert_eq!(body["drinks"][0]["title"], "Iced Matcha Latte");
    assert_eq!(body["drinks"][0]["recipe"][1]["name"], "matcha");

    Ok(())
}

#[tokio::test]
async fn test_update_recipe_keeps_title() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;

    let response = Client::new()
        .patch(format!("{}/drinks/1", server.url()))
        .header("Authorization", server.bearer(&["patch:drinks"]))
        .json(&json!({"recipe": [{"name": "sparkling water", "color": "clear", "parts": 1}]}))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["drinks"][0]["title"], "Water");
    assert_eq!(body["drinks"][0]["recipe"][0]["name"], "sparkling water");

    Ok(())
}

#[tokio::test]
async fn test_update_unknown_drink_is_404() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;

    let response = Client::new()
        .patch(format!("{}/drinks/99", server.url()))
        .header("Authorization", server.bearer(&["patch:drinks"]))
        .json(&json!({"title": "Ghost"}))
        .send()
        .await?;

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "not_found");
    assert_eq!(body["message"], "Drink with id=99 not found");

    Ok(())
}

#[tokio::test]
async fn test_update_empty_body_is_400() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;

    let response = Client::new()
        .patch(format!("{}/drinks/1", server.url()))
        .header("Authorization", server.bearer(&["patch:drinks"]))
        .json(&json!({}))
        .send()
        .await?;

    assert_eq!(response.status(), 400);

    Ok(())
}

#[tokio::test]
async fn test_update_to_existing_title_is_409() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;

    let response = Client::new()
        .patch(format!("{}/drinks/2", server.url()))
        .header("Authorization", server.bearer(&["patch:drinks"]))
        .json(&json!({"title": "Water"}))
        .send()
        .await?;

    assert_eq!(response.status(), 409);

    Ok(())
}

#[tokio::test]
async fn test_non_numeric_id_is_404() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;

    let response = Client::new()
        .patch(format!("{}/drinks/water", server.url()))
        .header("Authorization", server.bearer(&["patch:drinks"]))
        .json(&json!({"title": "Still Water"}))
        .send()
        .await?;

    assert_eq!(response.status(), 404);

    Ok(())
}

// =============================================================================
// DELETE /drinks/:id
// =============================================================================

#[tokio::test]
async fn test_delete_drink() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;

    let response = Client::new()
        .delete(format!("{}/drinks/1", server.url()))
        .header("Authorization", server.bearer(&["delete:drinks"]))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"success": true, "delete": 1}));

    let menu = list_menu(&server).await?;
    let drinks = menu["drinks"].as_array().unwrap();
    assert_eq!(drinks.len(), 1);
    assert_eq!(menu["drinks"][0]["title"], "Matcha Latte");

    Ok(())
}

#[tokio::test]
async fn test_delete_twice_is_404() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;
    let bearer = server.bearer(&["delete:drinks"]);
    let client = Client::new();

    let first = client
        .delete(format!("{}/drinks/1", server.url()))
        .header("Authorization", &bearer)
        .send()
        .await?;
    assert_eq!(first.status(), 200);

    let second = client
        .delete(format!("{}/drinks/1", server.url()))
        .header("Authorization", &bearer)
        .send()
        .await?;
    assert_eq!(second.status(), 404);

    Ok(())
}

#[tokio::test]
async fn test_ids_not_reused_after_delete() -> Result<()> {
    let server = TestDrinksServer::spawn_with_drinks(menu()).await?;
    let bearer = server.bearer(ALL_PERMISSIONS);
    let client = Client::new();

    client
        .delete(format!("{}/drinks/2", server.url()))
        .header("Authorization", &bearer)
        .send()
        .await?;

    let body: Value = client
        .post(format!("{}/drinks", server.url()))
        .header("Authorization", &bearer)
        .json(&json!({
            "title": "Cortado",
            "recipe": [{"name": "espresso", "color": "brown", "parts": 1}]
        }))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["drinks"][0]["id"], 3);

    Ok(())
}
