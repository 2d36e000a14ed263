//! Drink menu handlers.
//!
//! - `GET /drinks` - Public menu (short representation)
//! - `GET /drinks-detail` - Full recipes (`get:drinks-detail`)
//! - `POST /drinks` - Add a drink (`post:drinks`)
//! - `PATCH /drinks/:id` - Modify a drink (`patch:drinks`)
//! - `DELETE /drinks/:id` - Remove a drink (`delete:drinks`)
//!
//! Protected handlers receive the verified claims as their first argument;
//! the authorization middleware has already run by the time they are called.

use crate::auth::Claims;
use crate::errors::DrinksError;
use crate::models::{
    CreateDrinkRequest, DeleteDrinkResponse, Drink, DrinkUpdate, DrinksResponse, NewDrink,
    RecipePart, ShortDrink, UpdateDrinkRequest,
};
use crate::routes::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /drinks
///
/// Public endpoint; recipes are returned without ingredient names.
#[instrument(skip_all, name = "drinks.handlers.list")]
pub async fn list_drinks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DrinksResponse<ShortDrink>>, DrinksError> {
    let drinks = state.repo.list().await?;

    Ok(Json(DrinksResponse::new(
        drinks.iter().map(Drink::short).collect(),
    )))
}

/// Handler for GET /drinks-detail
#[instrument(skip_all, name = "drinks.handlers.detail")]
pub async fn list_drinks_detail(
    Extension(_claims): Extension<Claims>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DrinksResponse<Drink>>, DrinksError> {
    let drinks = state.repo.list().await?;

    Ok(Json(DrinksResponse::new(drinks)))
}

/// Handler for POST /drinks
///
/// # Response
///
/// - 200 OK: `{"success": true, "drinks": [<created drink>]}`
/// - 400 Bad Request: Empty title or recipe
/// - 409 Conflict: Title already on the menu
/// - 422 Unprocessable Entity: Malformed body or missing field
#[instrument(skip_all, name = "drinks.handlers.create")]
pub async fn create_drink(
    Extension(_claims): Extension<Claims>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<Drink>>, DrinksError> {
    let Json(request) = payload?;

    let new_drink = NewDrink {
        title: validate_title(&request.title)?,
        recipe: validate_recipe(request.recipe.into_parts())?,
    };

    let drink = state.repo.create(new_drink).await?;

    tracing::info!(target: "drinks.handlers", id = drink.id, "Drink added to menu");

    Ok(Json(DrinksResponse::new(vec![drink])))
}

/// Handler for PATCH /drinks/:id
///
/// Either field may be omitted; at least one must be present.
///
/// # Response
///
/// - 200 OK: `{"success": true, "drinks": [<updated drink>]}`
/// - 400 Bad Request: Empty body, empty title or empty recipe
/// - 404 Not Found: Unknown id
/// - 409 Conflict: Title already used by another drink
/// - 422 Unprocessable Entity: Malformed body
#[instrument(skip_all, name = "drinks.handlers.update")]
pub async fn update_drink(
    Extension(_claims): Extension<Claims>,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<Drink>>, DrinksError> {
    let id = drink_id(id)?;
    let Json(request) = payload?;

    if request.title.is_none() && request.recipe.is_none() {
        return Err(DrinksError::BadRequest(
            "At least one of title or recipe must be provided".to_string(),
        ));
    }

    let update = DrinkUpdate {
        title: request.title.as_deref().map(validate_title).transpose()?,
        recipe: request
            .recipe
            .map(|recipe| validate_recipe(recipe.into_parts()))
            .transpose()?,
    };

    let drink = state
        .repo
        .update(id, update)
        .await?
        .ok_or_else(|| DrinksError::drink_not_found(id))?;

    tracing::info!(target: "drinks.handlers", id, "Drink updated");

    Ok(Json(DrinksResponse::new(vec![drink])))
}

/// Handler for DELETE /drinks/:id
///
/// # Response
///
/// - 200 OK: `{"success": true, "delete": <id>}`
/// - 404 Not Found: Unknown id
#[instrument(skip_all, name = "drinks.handlers.delete")]
pub async fn delete_drink(
    Extension(_claims): Extension<Claims>,
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteDrinkResponse>, DrinksError> {
    let id = drink_id(id)?;

    if !state.repo.delete(id).await? {
        return Err(DrinksError::drink_not_found(id));
    }

    tracing::info!(target: "drinks.handlers", id, "Drink removed from menu");

    Ok(Json(DeleteDrinkResponse {
        success: true,
        delete: id,
    }))
}

/// Non-numeric ids cannot name a drink.
fn drink_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, DrinksError> {
    id.map(|Path(id)| id).map_err(|e| {
        tracing::debug!(target: "drinks.handlers", error = %e, "Invalid drink id in path");
        DrinksError::NotFound("Resource not found".to_string())
    })
}

fn validate_title(title: &str) -> Result<String, DrinksError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DrinksError::BadRequest(
            "Drink title must not be empty".to_string(),
        ));
    }
    Ok(title.to_string())
}

fn validate_recipe(recipe: Vec<RecipePart>) -> Result<Vec<RecipePart>, DrinksError> {
    if recipe.is_empty() {
        return Err(DrinksError::BadRequest(
            "Drink recipe must contain at least one part".to_string(),
        ));
    }
    Ok(recipe)
}
