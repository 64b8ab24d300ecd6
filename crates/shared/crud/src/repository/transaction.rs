//! Transaction scope helpers.
//!
//! Writes open a read-write transaction and reads a read-only one, both at
//! READ COMMITTED. [`finish`] commits on success and rolls back otherwise.

use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};

use common::{AppError, AppResult};

pub async fn begin(db: &DatabaseConnection, mode: AccessMode) -> AppResult<DatabaseTransaction> {
    db.begin_with_config(Some(IsolationLevel::ReadCommitted), Some(mode))
        .await
        .map_err(AppError::from)
}

pub async fn begin_write(db: &DatabaseConnection) -> AppResult<DatabaseTransaction> {
    begin(db, AccessMode::ReadWrite).await
}

pub async fn begin_read(db: &DatabaseConnection) -> AppResult<DatabaseTransaction> {
    begin(db, AccessMode::ReadOnly).await
}

/// Commit on `Ok`, roll back on `Err`.
pub async fn finish<T>(txn: DatabaseTransaction, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            txn.commit().await.map_err(AppError::from)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!("Transaction rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}
