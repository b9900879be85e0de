use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::domain::search::{SearchRecord, Source};
use crate::entities::searches;

pub struct SearchRepository {
    conn: DatabaseConnection,
}

impl SearchRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// List records owned by `owner_id`, newest first.
    ///
    /// Equal `created_at` values are broken by `id` descending, so later
    /// insertions sort first and the order is a stable total order.
    pub async fn list_for_owner(&self, owner_id: i32, limit: u64) -> Result<Vec<SearchRecord>> {
        let rows = searches::Entity::find()
            .filter(searches::Column::OwnerId.eq(owner_id))
            .order_by_desc(searches::Column::CreatedAt)
            .order_by_desc(searches::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list search records")?;

        rows.into_iter().map(decode_record).collect()
    }

    /// Insert a completed search. `created_at` is set here, never by the
    /// caller. Returns the new record id.
    pub async fn insert(
        &self,
        owner_id: i32,
        query: &str,
        response: &str,
        sources: &[Source],
    ) -> Result<i32> {
        let sources_json =
            serde_json::to_string(sources).context("Failed to encode sources as JSON")?;

        let active = searches::ActiveModel {
            owner_id: Set(owner_id),
            query: Set(query.to_string()),
            response: Set(response.to_string()),
            sources_json: Set(sources_json),
            created_at: Set(chrono::Utc::now().timestamp_millis()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert search record")?;

        Ok(model.id)
    }

    /// Delete a record owned by `owner_id`. Returns false when no row
    /// matched, which covers both "does not exist" and "owned by someone
    /// else" without distinguishing them.
    pub async fn delete(&self, owner_id: i32, record_id: i32) -> Result<bool> {
        let result = searches::Entity::delete_many()
            .filter(searches::Column::Id.eq(record_id))
            .filter(searches::Column::OwnerId.eq(owner_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete search record")?;

        Ok(result.rows_affected > 0)
    }
}

fn decode_record(model: searches::Model) -> Result<SearchRecord> {
    let sources: Vec<Source> = serde_json::from_str(&model.sources_json)
        .context("Stored sources column is not valid JSON")?;

    Ok(SearchRecord {
        id: model.id,
        query: model.query,
        response: model.response,
        sources,
        created_at: model.created_at,
    })
}
