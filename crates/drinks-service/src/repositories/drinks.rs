//! Drinks repository for database operations.
//!
//! The recipe is stored as JSON text in a single column, so the table stays
//! flat while a recipe keeps its ordered list of parts.
//!
//! # Security
//!
//! - All queries use parameterized statements (SQL injection safe)
//! - Unique-title violations are reported as conflicts, other database
//!   errors are logged server-side and surface as a generic 500

use crate::errors::DrinksError;
use crate::models::{Drink, DrinkUpdate, NewDrink, RecipePart};
use crate::observability::metrics;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::instrument;

/// Storage operations on the drink menu.
#[async_trait]
pub trait DrinkRepository: Send + Sync {
    /// All drinks ordered by id.
    async fn list(&self) -> Result<Vec<Drink>, DrinksError>;

    /// One drink, `None` if the id is unknown.
    async fn get(&self, id: i64) -> Result<Option<Drink>, DrinksError>;

    /// Insert a drink and return it with its assigned id.
    ///
    /// Returns `DrinksError::Conflict` if the title is taken.
    async fn create(&self, drink: NewDrink) -> Result<Drink, DrinksError>;

    /// Apply a partial update, `None` if the id is unknown.
    ///
    /// Returns `DrinksError::Conflict` if the new title is taken.
    async fn update(&self, id: i64, update: DrinkUpdate) -> Result<Option<Drink>, DrinksError>;

    /// Delete a drink; `false` if the id is unknown.
    async fn delete(&self, id: i64) -> Result<bool, DrinksError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), DrinksError>;
}

/// PostgreSQL-backed drink repository.
#[derive(Clone)]
pub struct PgDrinkRepository {
    pool: PgPool,
}

impl PgDrinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Record query metrics and map the sqlx error.
fn observe<T>(
    operation: &'static str,
    start: Instant,
    result: Result<T, sqlx::Error>,
) -> Result<T, DrinksError> {
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::record_db_query(operation, status, start.elapsed());

    result.map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            tracing::debug!(target: "drinks.repo", operation, "Unique constraint violated");
            DrinksError::Conflict("A drink with this title already exists".to_string())
        }
        _ => DrinksError::from(e),
    })
}

fn encode_recipe(recipe: &[RecipePart]) -> Result<String, DrinksError> {
    serde_json::to_string(recipe).map_err(|e| {
        tracing::error!(target: "drinks.repo", error = %e, "Failed to encode recipe");
        DrinksError::Internal
    })
}

fn map_row_to_drink(row: &PgRow) -> Result<Drink, DrinksError> {
    let id: i64 = row.try_get("id")?;
    let title: String = row.try_get("title")?;
    let recipe_json: String = row.try_get("recipe")?;

    let recipe = serde_json::from_str(&recipe_json).map_err(|e| {
        tracing::error!(target: "drinks.repo", id, error = %e, "Stored recipe is not valid JSON");
        DrinksError::Internal
    })?;

    Ok(Drink { id, title, recipe })
}

#[async_trait]
impl DrinkRepository for PgDrinkRepository {
    #[instrument(skip_all, name = "drinks.repo.list")]
    async fn list(&self) -> Result<Vec<Drink>, DrinksError> {
        let start = Instant::now();

        let rows = observe(
            "list_drinks",
            start,
            sqlx::query("SELECT id, title, recipe FROM drinks ORDER BY id")
                .fetch_all(&self.pool)
                .await,
        )?;

        rows.iter().map(map_row_to_drink).collect()
    }

    #[instrument(skip_all, name = "drinks.repo.get", fields(id = id))]
    async fn get(&self, id: i64) -> Result<Option<Drink>, DrinksError> {
        let start = Instant::now();

        let row = observe(
            "get_drink",
            start,
            sqlx::query("SELECT id, title, recipe FROM drinks WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await,
        )?;

        row.as_ref().map(map_row_to_drink).transpose()
    }

    #[instrument(skip_all, name = "drinks.repo.create")]
    async fn create(&self, drink: NewDrink) -> Result<Drink, DrinksError> {
        let recipe_json = encode_recipe(&drink.recipe)?;
        let start = Instant::now();

        let row = observe(
            "insert_drink",
            start,
            sqlx::query(
                r#"
                INSERT INTO drinks (title, recipe)
                VALUES ($1, $2)
                RETURNING id, title, recipe
                "#,
            )
            .bind(&drink.title) // $1
            .bind(&recipe_json) // $2
            .fetch_one(&self.pool)
            .await,
        )?;

        let created = map_row_to_drink(&row)?;
        tracing::info!(target: "drinks.repo", id = created.id, "Drink created");
        Ok(created)
    }

    #[instrument(skip_all, name = "drinks.repo.update", fields(id = id))]
    async fn update(&self, id: i64, update: DrinkUpdate) -> Result<Option<Drink>, DrinksError> {
        let recipe_json = update
            .recipe
            .as_deref()
            .map(encode_recipe)
            .transpose()?;
        let start = Instant::now();

        let row = observe(
            "update_drink",
            start,
            sqlx::query(
                r#"
                UPDATE drinks
                SET title = COALESCE($2, title),
                    recipe = COALESCE($3, recipe)
                WHERE id = $1
                RETURNING id, title, recipe
                "#,
            )
            .bind(id) // $1
            .bind(update.title.as_deref()) // $2
            .bind(recipe_json.as_deref()) // $3
            .fetch_optional(&self.pool)
            .await,
        )?;

        row.as_ref().map(map_row_to_drink).transpose()
    }

    #[instrument(skip_all, name = "drinks.repo.delete", fields(id = id))]
    async fn delete(&self, id: i64) -> Result<bool, DrinksError> {
        let start = Instant::now();

        let result = observe(
            "delete_drink",
            start,
            sqlx::query("DELETE FROM drinks WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await,
        )?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), DrinksError> {
        let start = Instant::now();

        observe(
            "ping",
            start,
            sqlx::query("SELECT 1").execute(&self.pool).await,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_recipe_is_a_json_list() {
        let json = encode_recipe(&[RecipePart {
            name: "water".to_string(),
            color: "blue".to_string(),
            parts: 1,
        }]);

        assert_eq!(
            json.ok().as_deref(),
            Some(r#"[{"name":"water","color":"blue","parts":1}]"#)
        );
    }

    #[test]
    fn test_observe_maps_row_not_found_to_database_error() {
        let result: Result<(), DrinksError> =
            observe("get_drink", Instant::now(), Err(sqlx::Error::RowNotFound));

        assert!(matches!(result, Err(DrinksError::Database(_))));
    }

    #[test]
    fn test_pg_repository_is_clone() {
        fn assert_repo<T: DrinkRepository + Clone>() {}
        assert_repo::<PgDrinkRepository>();
    }
}
