//! Drinks service models.
//!
//! Contains the drink menu data types and the request/response bodies of the
//! HTTP API.

use serde::{Deserialize, Serialize};

/// One ingredient of a drink recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipePart {
    /// Ingredient name (e.g. "espresso").
    pub name: String,

    /// Display color used when drawing the drink.
    pub color: String,

    /// Relative amount of this ingredient.
    pub parts: i64,
}

/// A drink on the menu.
///
/// Serializes as the long representation: every recipe field included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drink {
    /// Database identifier.
    pub id: i64,

    /// Menu title, unique across drinks.
    pub title: String,

    /// Recipe as an ordered list of parts.
    pub recipe: Vec<RecipePart>,
}

/// Recipe part in the short representation (ingredient names hidden).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortRecipePart {
    pub color: String,
    pub parts: i64,
}

/// Short representation of a drink, shown on the public menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortDrink {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<ShortRecipePart>,
}

impl Drink {
    /// Public representation without ingredient names.
    pub fn short(&self) -> ShortDrink {
        ShortDrink {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|part| ShortRecipePart {
                    color: part.color.clone(),
                    parts: part.parts,
                })
                .collect(),
        }
    }
}

/// Recipe as sent by clients: a single part or a list of parts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecipeInput {
    One(RecipePart),
    Many(Vec<RecipePart>),
}

impl RecipeInput {
    pub fn into_parts(self) -> Vec<RecipePart> {
        match self {
            RecipeInput::One(part) => vec![part],
            RecipeInput::Many(parts) => parts,
        }
    }
}

/// Body of `POST /drinks`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDrinkRequest {
    pub title: String,
    pub recipe: RecipeInput,
}

/// Body of `PATCH /drinks/:id`. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDrinkRequest {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub recipe: Option<RecipeInput>,
}

/// A validated drink ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Vec<RecipePart>,
}

/// A validated partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrinkUpdate {
    pub title: Option<String>,
    pub recipe: Option<Vec<RecipePart>>,
}

/// `{"success": true, "drinks": [...]}` body shared by the drink endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T> DrinksResponse<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

/// Body of a successful `DELETE /drinks/:id`.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteDrinkResponse {
    pub success: bool,
    pub delete: i64,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status ("healthy" or "unhealthy").
    pub status: String,

    /// Database connectivity status.
    pub database: String,
}
