// src/services/inventory_service.rs
use crate::{
    calendar,
    error::{AppError, AppResult},
    models::class::{Inventory, InventoryPayload},
    services::new_id,
};
use sqlx::SqlitePool;

const INVENTORY_COLUMNS: &str = "id, class_id, quarter, bibles, magazines, offerings, updated_at";

pub async fn find_inventory(db_pool: &SqlitePool, class_id: &str, quarter: &str) -> AppResult<Option<Inventory>> {
    let inventory = sqlx::query_as::<_, Inventory>(&format!(
        "SELECT {} FROM inventory WHERE class_id = ?1 AND quarter = ?2",
        INVENTORY_COLUMNS
    ))
    .bind(class_id)
    .bind(quarter)
    .fetch_optional(db_pool)
    .await?;
    Ok(inventory)
}

/// Inventário do trimestre; sem registo gravado devolve um a zeros.
pub async fn get_inventory(db_pool: &SqlitePool, class_id: &str, quarter: &str) -> AppResult<Inventory> {
    Ok(find_inventory(db_pool, class_id, quarter)
        .await?
        .unwrap_or_else(|| Inventory::empty(class_id, quarter)))
}

pub async fn list_inventory_for_quarter(db_pool: &SqlitePool, quarter: &str) -> AppResult<Vec<Inventory>> {
    let rows = sqlx::query_as::<_, Inventory>(&format!(
        "SELECT {} FROM inventory WHERE quarter = ?1",
        INVENTORY_COLUMNS
    ))
    .bind(quarter)
    .fetch_all(db_pool)
    .await?;
    Ok(rows)
}

/// Grava os contadores do trimestre atual. Sem controlo de versão: a última
/// escrita a chegar ganha.
pub async fn save_inventory(db_pool: &SqlitePool, class_id: &str, payload: &InventoryPayload) -> AppResult<Inventory> {
    if payload.bibles < 0 || payload.magazines < 0 || payload.offerings < 0.0 || !payload.offerings.is_finite() {
        return Err(AppError::Validation("Os valores do inventário não podem ser negativos.".to_string()));
    }
    let quarter = calendar::current_quarter();

    sqlx::query(
        r#"
        INSERT INTO inventory (id, class_id, quarter, bibles, magazines, offerings)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(class_id, quarter) DO UPDATE SET
            bibles = excluded.bibles,
            magazines = excluded.magazines,
            offerings = excluded.offerings,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(new_id())
    .bind(class_id)
    .bind(&quarter)
    .bind(payload.bibles)
    .bind(payload.magazines)
    .bind(payload.offerings)
    .execute(db_pool)
    .await?;
    tracing::info!("📦 Inventário da turma {} gravado ({}).", class_id, quarter);

    find_inventory(db_pool, class_id, &quarter)
        .await?
        .ok_or(AppError::InternalServerError)
}
