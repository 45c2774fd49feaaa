// src/common/db_utils.rs

use std::time::Duration;

use sqlx::{PgPool, Postgres, Transaction};

use crate::common::error::AppError;

// ---
// Helper de Transação com lock_timeout
// ---
/// Abre uma transação e limita quanto tempo ela pode esperar por um lock de linha.
/// `set_config(..., true)` vale só para esta transação; ao estourar o tempo o Postgres
/// devolve 55P03, que vira `AppError::Retryable`.
pub async fn begin_with_lock_timeout(
    pool: &PgPool,
    lock_timeout: Duration,
) -> Result<Transaction<'static, Postgres>, AppError> {
    // 1. Inicia a transação
    let mut tx = pool.begin().await?;

    // 2. Define o limite de espera por locks
    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{}ms", lock_timeout.as_millis()))
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
