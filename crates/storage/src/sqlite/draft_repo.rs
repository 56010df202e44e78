use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use exam_core::model::{PartContent, SessionId};

use super::SqliteDraftStore;
use crate::repository::{DraftRecord, DraftRepository, StorageError};

fn connection_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl DraftRepository for SqliteDraftStore {
    async fn save(&self, record: &DraftRecord) -> Result<(), StorageError> {
        let content = serde_json::to_string(&record.content)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        sqlx::query(
            r"
                INSERT INTO drafts (session_id, part_index, content, saved_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(session_id, part_index) DO UPDATE SET
                    content = excluded.content,
                    saved_at = excluded.saved_at
            ",
        )
        .bind(record.session_id.to_string())
        .bind(i64::from(record.part_index))
        .bind(content)
        .bind(record.saved_at)
        .execute(self.pool())
        .await
        .map_err(connection_err)?;

        Ok(())
    }

    async fn load(
        &self,
        session_id: &SessionId,
        part_index: u32,
    ) -> Result<Option<DraftRecord>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT content, saved_at
                FROM drafts
                WHERE session_id = ?1 AND part_index = ?2
            ",
        )
        .bind(session_id.to_string())
        .bind(i64::from(part_index))
        .fetch_optional(self.pool())
        .await
        .map_err(connection_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let content: String = row.try_get("content").map_err(connection_err)?;
        let content: PartContent = serde_json::from_str(&content)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let saved_at: DateTime<Utc> = row.try_get("saved_at").map_err(connection_err)?;

        Ok(Some(DraftRecord {
            session_id: session_id.clone(),
            part_index,
            content,
            saved_at,
        }))
    }

    async fn clear(&self, session_id: &SessionId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM drafts WHERE session_id = ?1")
            .bind(session_id.to_string())
            .execute(self.pool())
            .await
            .map_err(connection_err)?;
        Ok(())
    }
}
