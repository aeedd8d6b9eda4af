//! # Ingredient Repository
//!
//! Kitchen inventory: raw ingredients and their stock movements.
//!
//! ## Movement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  apply_movement (one transaction)                       │
//! │                                                                         │
//! │  ENTRY 5 kg ──► current_stock + 5                                      │
//! │  EXIT  2 kg ──► current_stock - 2   only if the result stays >= 0      │
//! │                      │                                                  │
//! │                      ├── no row updated + ingredient exists            │
//! │                      │        → InsufficientStock (nothing written)    │
//! │                      └── row updated → INSERT inventory_movements      │
//! │                                                                         │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbResult, PosResult};
use poli_core::validation::{validate_inventory_movement, validate_new_ingredient};
use poli_core::{
    CoreError, Ingredient, InventoryMovement, InventoryMovementType, NewIngredient,
    NewInventoryMovement,
};

const INGREDIENT_COLUMNS: &str =
    "id, name, description, unit, current_stock, min_stock, cost, created_at, updated_at";

const MOVEMENT_COLUMNS: &str =
    "id, ingredient_id, movement_type, quantity, reason, user_id, created_at";

#[derive(Debug, Clone)]
pub struct IngredientRepository {
    pool: SqlitePool,
}

impl IngredientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        IngredientRepository { pool }
    }

    pub async fn create(&self, new: NewIngredient) -> PosResult<Ingredient> {
        validate_new_ingredient(&new)?;

        let now = Utc::now();
        let ingredient = Ingredient {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            description: new.description,
            unit: new.unit.trim().to_string(),
            current_stock: new.current_stock,
            min_stock: new.min_stock,
            cost: new.cost,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO ingredients (
                id, name, description, unit, current_stock, min_stock, cost, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&ingredient.id)
        .bind(&ingredient.name)
        .bind(&ingredient.description)
        .bind(&ingredient.unit)
        .bind(ingredient.current_stock)
        .bind(ingredient.min_stock)
        .bind(ingredient.cost)
        .bind(ingredient.created_at)
        .bind(ingredient.updated_at)
        .execute(&self.pool)
        .await?;

        info!(ingredient_id = %ingredient.id, name = %ingredient.name, "Ingredient created");
        Ok(ingredient)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Ingredient>> {
        let sql = format!("SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = ?1");
        let ingredient = sqlx::query_as::<_, Ingredient>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ingredient)
    }

    pub async fn list(&self) -> DbResult<Vec<Ingredient>> {
        let sql = format!("SELECT {INGREDIENT_COLUMNS} FROM ingredients ORDER BY name");
        let ingredients = sqlx::query_as::<_, Ingredient>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(ingredients)
    }

    /// Ingredients at or below their reorder threshold.
    pub async fn low_stock(&self) -> DbResult<Vec<Ingredient>> {
        let sql = format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE current_stock <= min_stock ORDER BY name"
        );
        let ingredients = sqlx::query_as::<_, Ingredient>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(ingredients)
    }

    /// Most recent movements of one ingredient, newest first.
    pub async fn movements(&self, ingredient_id: &str, limit: u32) -> DbResult<Vec<InventoryMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements WHERE ingredient_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        );
        let movements = sqlx::query_as::<_, InventoryMovement>(&sql)
            .bind(ingredient_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(movements)
    }

    /// Records an ENTRY or EXIT and adjusts the stock, atomically.
    ///
    /// ## When This Fails
    /// - Unknown ingredient → `NotFound`
    /// - EXIT larger than the stock → `InsufficientStock`, nothing written
    pub async fn apply_movement(
        &self,
        user_id: &str,
        new: NewInventoryMovement,
    ) -> PosResult<(Ingredient, InventoryMovement)> {
        validate_inventory_movement(&new)?;

        let delta = match new.movement_type {
            InventoryMovementType::Entry => new.quantity,
            InventoryMovementType::Exit => -new.quantity,
        };
        let now = Utc::now();

        debug!(
            ingredient_id = %new.ingredient_id,
            movement_type = ?new.movement_type,
            quantity = new.quantity,
            "Applying inventory movement"
        );

        let mut tx = self.pool.begin().await?;

        // Write first so the transaction holds the lock before reading.
        let sql = format!(
            r#"
            UPDATE ingredients
            SET current_stock = current_stock + ?2, updated_at = ?3
            WHERE id = ?1 AND current_stock + ?2 >= 0
            RETURNING {INGREDIENT_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Ingredient>(&sql)
            .bind(&new.ingredient_id)
            .bind(delta)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        let ingredient = match updated {
            Some(ingredient) => ingredient,
            None => {
                let available: Option<(String, f64)> =
                    sqlx::query_as("SELECT name, current_stock FROM ingredients WHERE id = ?1")
                        .bind(&new.ingredient_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(match available {
                    Some((name, available)) => CoreError::InsufficientStock {
                        item: name,
                        available,
                        requested: new.quantity,
                    },
                    None => CoreError::not_found("Ingredient", &new.ingredient_id),
                }
                .into());
            }
        };

        let movement = InventoryMovement {
            id: Uuid::new_v4().to_string(),
            ingredient_id: ingredient.id.clone(),
            movement_type: new.movement_type,
            quantity: new.quantity,
            reason: new.reason,
            user_id: user_id.to_string(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO inventory_movements (
                id, ingredient_id, movement_type, quantity, reason, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.ingredient_id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(&movement.reason)
        .bind(&movement.user_id)
        .bind(movement.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            ingredient_id = %ingredient.id,
            current_stock = ingredient.current_stock,
            "Inventory movement applied"
        );
        Ok((ingredient, movement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use poli_core::{ErrorKind, Money};

    fn flour() -> NewIngredient {
        NewIngredient {
            name: "Harina".to_string(),
            description: None,
            unit: "kg".to_string(),
            current_stock: 10.0,
            min_stock: 5.0,
            cost: Money::new(6_500),
        }
    }

    fn movement(id: &str, movement_type: InventoryMovementType, quantity: f64) -> NewInventoryMovement {
        NewInventoryMovement {
            ingredient_id: id.to_string(),
            movement_type,
            quantity,
            reason: None,
        }
    }

    #[tokio::test]
    async fn test_entry_and_exit_adjust_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.ingredients();
        let flour = repo.create(flour()).await.unwrap();

        let (after_entry, _) = repo
            .apply_movement("u1", movement(&flour.id, InventoryMovementType::Entry, 2.5))
            .await
            .unwrap();
        assert_eq!(after_entry.current_stock, 12.5);

        let (after_exit, recorded) = repo
            .apply_movement("u1", movement(&flour.id, InventoryMovementType::Exit, 8.0))
            .await
            .unwrap();
        assert_eq!(after_exit.current_stock, 4.5);
        assert_eq!(recorded.movement_type, InventoryMovementType::Exit);

        assert_eq!(repo.movements(&flour.id, 10).await.unwrap().len(), 2);
        assert_eq!(repo.low_stock().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exit_beyond_stock_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.ingredients();
        let flour = repo.create(flour()).await.unwrap();

        let err = repo
            .apply_movement("u1", movement(&flour.id, InventoryMovementType::Exit, 10.5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let stored = repo.get(&flour.id).await.unwrap().unwrap();
        assert_eq!(stored.current_stock, 10.0);
        assert!(repo.movements(&flour.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_movement_on_unknown_ingredient() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .ingredients()
            .apply_movement("u1", movement("ghost", InventoryMovementType::Entry, 1.0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
