//! Connection helpers for handlers. Mutations run in one transaction each;
//! reads borrow a pooled connection.

use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres, Transaction};

use crate::api::errors::ApiError;

pub(crate) async fn begin(pool: &PgPool) -> Result<Transaction<'static, Postgres>, ApiError> {
    pool.begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))
}

pub(crate) async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), ApiError> {
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))
}

pub(crate) async fn acquire(pool: &PgPool) -> Result<PoolConnection<Postgres>, ApiError> {
    pool.acquire().await.map_err(|e| ApiError::internal(e, "Failed to acquire connection"))
}
