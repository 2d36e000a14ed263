//! In-memory drink repository.
//!
//! Used by tests and local runs that have no database. Ids increase
//! monotonically and are never reused after a delete.

use crate::errors::DrinksError;
use crate::models::{Drink, DrinkUpdate, NewDrink};
use crate::repositories::DrinkRepository;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Store {
    last_id: i64,
    drinks: BTreeMap<i64, Drink>,
}

impl Store {
    fn title_taken(&self, title: &str, except: Option<i64>) -> bool {
        self.drinks
            .values()
            .any(|d| d.title == title && Some(d.id) != except)
    }
}

/// Drink repository kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryDrinkRepository {
    store: RwLock<Store>,
}

impl InMemoryDrinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with `drinks` (ids assigned in order).
    pub fn with_drinks(drinks: Vec<NewDrink>) -> Self {
        let mut store = Store::default();
        for drink in drinks {
            store.last_id += 1;
            store.drinks.insert(
                store.last_id,
                Drink {
                    id: store.last_id,
                    title: drink.title,
                    recipe: drink.recipe,
                },
            );
        }
        Self {
            store: RwLock::new(store),
        }
    }
}

fn title_conflict() -> DrinksError {
    DrinksError::Conflict("A drink with this title already exists".to_string())
}

#[async_trait]
impl DrinkRepository for InMemoryDrinkRepository {
    async fn list(&self) -> Result<Vec<Drink>, DrinksError> {
        Ok(self.store.read().await.drinks.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Drink>, DrinksError> {
        Ok(self.store.read().await.drinks.get(&id).cloned())
    }

    async fn create(&self, drink: NewDrink) -> Result<Drink, DrinksError> {
        let mut store = self.store.write().await;
        if store.title_taken(&drink.title, None) {
            return Err(title_conflict());
        }

        store.last_id += 1;
        let created = Drink {
            id: store.last_id,
            title: drink.title,
            recipe: drink.recipe,
        };
        store.drinks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, update: DrinkUpdate) -> Result<Option<Drink>, DrinksError> {
        let mut store = self.store.write().await;

        if !store.drinks.contains_key(&id) {
            return Ok(None);
        }
        if let Some(title) = update.title.as_deref() {
            if store.title_taken(title, Some(id)) {
                return Err(title_conflict());
            }
        }

        let Some(drink) = store.drinks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            drink.title = title;
        }
        if let Some(recipe) = update.recipe {
            drink.recipe = recipe;
        }
        Ok(Some(drink.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, DrinksError> {
        Ok(self.store.write().await.drinks.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), DrinksError> {
        Ok(())
    }
}
