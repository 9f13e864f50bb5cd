//! Consistent database snapshots for the admin download.
//!
//! `VACUUM INTO` writes a compacted copy of the live database to a new file
//! without blocking readers. It runs on the writer connection so the copy
//! sits between two committed writes.

use std::path::Path;

use tebnegar_types::error::RepositoryError;
use tracing::{debug, warn};

use super::pool::DatabasePool;

/// Write a snapshot of the database to `path`, which must not exist yet.
pub async fn snapshot_to(pool: &DatabasePool, path: &Path) -> Result<(), RepositoryError> {
    let target = path
        .to_str()
        .ok_or_else(|| RepositoryError::Query(format!("non UTF-8 backup path: {}", path.display())))?;

    sqlx::query("VACUUM INTO ?")
        .bind(target)
        .execute(&pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(format!("snapshot failed: {e}")))?;
    Ok(())
}

/// Snapshot the database through a scratch file in `scratch_dir` and return
/// its bytes. The scratch file is removed afterwards.
pub async fn snapshot_bytes(
    pool: &DatabasePool,
    scratch_dir: &Path,
) -> Result<Vec<u8>, RepositoryError> {
    let path = scratch_dir.join(format!("snapshot-{}.db", uuid::Uuid::now_v7()));

    let result = match snapshot_to(pool, &path).await {
        Ok(()) => tokio::fs::read(&path)
            .await
            .map_err(|e| RepositoryError::Query(format!("reading snapshot: {e}"))),
        Err(e) => Err(e),
    };

    if let Err(e) = tokio::fs::remove_file(&path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "could not remove snapshot file");
        }
    }

    if let Ok(bytes) = &result {
        debug!(bytes = bytes.len(), "database snapshot taken");
    }
    result
}
