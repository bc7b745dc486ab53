//! # Postgres Store
//!
//! `BoardStore` and `ImportHistoryStore` on PostgreSQL through SQLx. Queries are
//! built at runtime so the crate compiles without a live database. The schema
//! lives in `migrations/0001_board_core.sql` and can be applied with
//! [`PgBoardStore::migrate`].

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use super::traits::{BoardStore, ImportHistoryStore, ItemFilter};
use crate::config::DatabaseConfig;
use crate::conformity::{ConformityLink, ConformityType};
use crate::error::{BoardError, BoardResult};
use crate::models::{
    ActivityLog, Board, BoardItem, Checklist, ImportHistory, ImportIncrement, ImportStatus,
    ItemType, Pipeline, Stage,
};
use crate::ordering::OrderSlot;
use crate::state_machine::ItemStatus;

const SCHEMA: &str = include_str!("../../migrations/0001_board_core.sql");

const ITEM_COLUMNS: &str = "id, item_type, name, stage_id, initial_stage_id, sort_order, status, \
    assigned_user_ids, watched_user_ids, products_data, user_id, created_at, modified_at, modified_by";

#[derive(Debug, Clone)]
pub struct PgBoardStore {
    pool: PgPool,
}

fn parse_column<T>(row: &PgRow, column: &str) -> BoardResult<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>()
        .map_err(|e| BoardError::PersistenceError(format!("column {column}: {e}")))
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

impl PgBoardStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using `database.url`, falling back to `DATABASE_URL`
    pub async fn connect(config: &DatabaseConfig) -> BoardResult<Self> {
        let url = match &config.url {
            Some(url) => url.clone(),
            None => std::env::var("DATABASE_URL").map_err(|_| {
                BoardError::ConfigurationError(
                    "database.url is not set and DATABASE_URL is missing".to_string(),
                )
            })?,
        };

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&url)
            .await?;

        info!(max_connections = config.max_connections, "Connected board store to Postgres");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the board tables if they do not exist yet
    pub async fn migrate(&self) -> BoardResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        debug!("Board schema applied");
        Ok(())
    }

    fn item_from_row(row: &PgRow) -> BoardResult<BoardItem> {
        let products: serde_json::Value = row.try_get("products_data")?;
        Ok(BoardItem {
            id: row.try_get("id")?,
            item_type: parse_column::<ItemType>(row, "item_type")?,
            name: row.try_get("name")?,
            stage_id: row.try_get("stage_id")?,
            initial_stage_id: row.try_get("initial_stage_id")?,
            order: row.try_get("sort_order")?,
            status: parse_column::<ItemStatus>(row, "status")?,
            assigned_user_ids: row.try_get("assigned_user_ids")?,
            watched_user_ids: row.try_get("watched_user_ids")?,
            products_data: serde_json::from_value(products)?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            modified_at: row.try_get("modified_at")?,
            modified_by: row.try_get("modified_by")?,
        })
    }

    fn stage_from_row(row: &PgRow) -> BoardResult<Stage> {
        Ok(Stage {
            id: row.try_get("id")?,
            pipeline_id: row.try_get("pipeline_id")?,
            name: row.try_get("name")?,
        })
    }

    fn conformity_from_row(row: &PgRow) -> BoardResult<ConformityLink> {
        Ok(ConformityLink {
            id: row.try_get("id")?,
            main_type: parse_column::<ConformityType>(row, "main_type")?,
            main_type_id: row.try_get("main_type_id")?,
            rel_type: parse_column::<ConformityType>(row, "rel_type")?,
            rel_type_id: row.try_get("rel_type_id")?,
        })
    }

    fn history_from_row(row: &PgRow) -> BoardResult<ImportHistory> {
        Ok(ImportHistory {
            id: row.try_get("id")?,
            content_type: row.try_get("content_type")?,
            total: to_u64(row.try_get("total")?),
            success: to_u64(row.try_get("success")?),
            failed: to_u64(row.try_get("failed")?),
            percentage: row.try_get("percentage")?,
            status: parse_column::<ImportStatus>(row, "status")?,
            ids: row.try_get("ids")?,
            error_msgs: row.try_get("error_msgs")?,
        })
    }

    fn push_item_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ItemFilter) {
        if let Some(item_type) = filter.item_type {
            builder
                .push(" AND item_type = ")
                .push_bind(item_type.module_name());
        }
        if let Some(stage_id) = filter.stage_id {
            builder.push(" AND stage_id = ").push_bind(stage_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.to_string());
        }
        if let Some(order) = filter.order_below {
            builder.push(" AND sort_order < ").push_bind(order);
        }
        if let Some(id) = filter.exclude_id {
            builder.push(" AND id <> ").push_bind(id);
        }
    }
}

#[async_trait]
impl BoardStore for PgBoardStore {
    async fn insert_board(&self, board: Board) -> BoardResult<()> {
        sqlx::query("INSERT INTO boards (id, name) VALUES ($1, $2)")
            .bind(board.id)
            .bind(&board.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_pipeline(&self, pipeline: Pipeline) -> BoardResult<()> {
        sqlx::query("INSERT INTO pipelines (id, board_id, name) VALUES ($1, $2, $3)")
            .bind(pipeline.id)
            .bind(pipeline.board_id)
            .bind(&pipeline.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_stage(&self, stage: Stage) -> BoardResult<()> {
        sqlx::query("INSERT INTO stages (id, pipeline_id, name) VALUES ($1, $2, $3)")
            .bind(stage.id)
            .bind(stage.pipeline_id)
            .bind(&stage.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_board(&self, id: Uuid) -> BoardResult<Option<Board>> {
        let row = sqlx::query("SELECT id, name FROM boards WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Board {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
            })
        })
        .transpose()
    }

    async fn find_pipeline(&self, id: Uuid) -> BoardResult<Option<Pipeline>> {
        let row = sqlx::query("SELECT id, board_id, name FROM pipelines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Pipeline {
                id: row.try_get("id")?,
                board_id: row.try_get("board_id")?,
                name: row.try_get("name")?,
            })
        })
        .transpose()
    }

    async fn find_stage(&self, id: Uuid) -> BoardResult<Option<Stage>> {
        sqlx::query("SELECT id, pipeline_id, name FROM stages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(Self::stage_from_row)
            .transpose()
    }

    async fn find_stage_by_name(&self, name: &str) -> BoardResult<Option<Stage>> {
        sqlx::query("SELECT id, pipeline_id, name FROM stages WHERE name = $1 LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(Self::stage_from_row)
            .transpose()
    }

    async fn find_item(&self, id: Uuid) -> BoardResult<Option<BoardItem>> {
        sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM board_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .as_ref()
        .map(Self::item_from_row)
        .transpose()
    }

    async fn find_items(&self, filter: &ItemFilter) -> BoardResult<Vec<BoardItem>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ITEM_COLUMNS} FROM board_items WHERE TRUE"
        ));
        Self::push_item_filter(&mut builder, filter);
        builder.push(" ORDER BY sort_order ASC, created_at ASC, id ASC");

        builder
            .build()
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(Self::item_from_row)
            .collect()
    }

    async fn count_items(&self, filter: &ItemFilter) -> BoardResult<u64> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS count FROM board_items WHERE TRUE");
        Self::push_item_filter(&mut builder, filter);

        let row = builder.build().fetch_one(&self.pool).await?;
        Ok(to_u64(row.try_get("count")?))
    }

    async fn insert_item(&self, item: BoardItem) -> BoardResult<()> {
        sqlx::query(&format!(
            "INSERT INTO board_items ({ITEM_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(item.id)
        .bind(item.item_type.module_name())
        .bind(&item.name)
        .bind(item.stage_id)
        .bind(item.initial_stage_id)
        .bind(item.order)
        .bind(item.status.to_string())
        .bind(&item.assigned_user_ids)
        .bind(&item.watched_user_ids)
        .bind(serde_json::to_value(&item.products_data)?)
        .bind(item.user_id)
        .bind(item.created_at)
        .bind(item.modified_at)
        .bind(item.modified_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_item(&self, item: &BoardItem) -> BoardResult<()> {
        let result = sqlx::query(
            "UPDATE board_items SET name = $2, stage_id = $3, sort_order = $4, status = $5, \
             assigned_user_ids = $6, watched_user_ids = $7, products_data = $8, \
             modified_at = $9, modified_by = $10 WHERE id = $1",
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.stage_id)
        .bind(item.order)
        .bind(item.status.to_string())
        .bind(&item.assigned_user_ids)
        .bind(&item.watched_user_ids)
        .bind(serde_json::to_value(&item.products_data)?)
        .bind(item.modified_at)
        .bind(item.modified_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BoardError::not_found("Board item", item.id));
        }
        Ok(())
    }

    async fn delete_item(&self, id: Uuid) -> BoardResult<Option<BoardItem>> {
        sqlx::query(&format!(
            "DELETE FROM board_items WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .as_ref()
        .map(Self::item_from_row)
        .transpose()
    }

    async fn update_orders(&self, stage_id: Uuid, orders: &[OrderSlot]) -> BoardResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;

        for slot in orders {
            let result =
                sqlx::query("UPDATE board_items SET sort_order = $1 WHERE id = $2 AND stage_id = $3")
                    .bind(slot.order)
                    .bind(slot.id)
                    .bind(stage_id)
                    .execute(&mut *tx)
                    .await?;
            updated += result.rows_affected();
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn set_stage_status(
        &self,
        item_type: ItemType,
        stage_id: Uuid,
        status: ItemStatus,
    ) -> BoardResult<u64> {
        let result =
            sqlx::query("UPDATE board_items SET status = $1 WHERE item_type = $2 AND stage_id = $3")
                .bind(status.to_string())
                .bind(item_type.module_name())
                .bind(stage_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn insert_conformity(&self, link: ConformityLink) -> BoardResult<()> {
        sqlx::query(
            "INSERT INTO conformities (id, main_type, main_type_id, rel_type, rel_type_id) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(link.id)
        .bind(link.main_type.as_str())
        .bind(link.main_type_id)
        .bind(link.rel_type.as_str())
        .bind(link.rel_type_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_conformities(
        &self,
        kind: ConformityType,
        id: Uuid,
    ) -> BoardResult<Vec<ConformityLink>> {
        sqlx::query(
            "SELECT id, main_type, main_type_id, rel_type, rel_type_id FROM conformities \
             WHERE (main_type = $1 AND main_type_id = $2) OR (rel_type = $1 AND rel_type_id = $2)",
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(Self::conformity_from_row)
        .collect()
    }

    async fn remove_conformities(&self, kind: ConformityType, id: Uuid) -> BoardResult<u64> {
        let result = sqlx::query(
            "DELETE FROM conformities \
             WHERE (main_type = $1 AND main_type_id = $2) OR (rel_type = $1 AND rel_type_id = $2)",
        )
        .bind(kind.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn remove_conformities_between(
        &self,
        main_type: ConformityType,
        main_type_id: Uuid,
        rel_type: ConformityType,
        rel_ids: &[Uuid],
    ) -> BoardResult<u64> {
        let result = sqlx::query(
            "DELETE FROM conformities WHERE \
             (main_type = $1 AND main_type_id = $2 AND rel_type = $3 AND rel_type_id = ANY($4)) \
             OR (rel_type = $1 AND rel_type_id = $2 AND main_type = $3 AND main_type_id = ANY($4))",
        )
        .bind(main_type.as_str())
        .bind(main_type_id)
        .bind(rel_type.as_str())
        .bind(rel_ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_checklist(&self, checklist: Checklist) -> BoardResult<()> {
        sqlx::query(
            "INSERT INTO checklists (id, content_type, content_type_id, title) VALUES ($1, $2, $3, $4)",
        )
        .bind(checklist.id)
        .bind(&checklist.content_type)
        .bind(checklist.content_type_id)
        .bind(&checklist.title)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_checklists(
        &self,
        content_type: &str,
        content_type_id: Uuid,
    ) -> BoardResult<Vec<Checklist>> {
        let rows = sqlx::query(
            "SELECT id, content_type, content_type_id, title FROM checklists \
             WHERE content_type = $1 AND content_type_id = $2",
        )
        .bind(content_type)
        .bind(content_type_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Checklist {
                    id: row.try_get("id")?,
                    content_type: row.try_get("content_type")?,
                    content_type_id: row.try_get("content_type_id")?,
                    title: row.try_get("title")?,
                })
            })
            .collect()
    }

    async fn remove_checklists(
        &self,
        content_type: &str,
        content_type_id: Uuid,
    ) -> BoardResult<u64> {
        let result =
            sqlx::query("DELETE FROM checklists WHERE content_type = $1 AND content_type_id = $2")
                .bind(content_type)
                .bind(content_type_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn insert_activity_log(&self, log: ActivityLog) -> BoardResult<()> {
        sqlx::query(
            "INSERT INTO activity_logs (id, content_type, content_id, action, user_id, content, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(log.id)
        .bind(&log.content_type)
        .bind(log.content_id)
        .bind(&log.action)
        .bind(log.user_id)
        .bind(&log.content)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_activity_logs(&self, content_id: Uuid) -> BoardResult<Vec<ActivityLog>> {
        let rows = sqlx::query(
            "SELECT id, content_type, content_id, action, user_id, content, created_at \
             FROM activity_logs WHERE content_id = $1 ORDER BY created_at ASC",
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ActivityLog {
                    id: row.try_get("id")?,
                    content_type: row.try_get("content_type")?,
                    content_id: row.try_get("content_id")?,
                    action: row.try_get("action")?,
                    user_id: row.try_get("user_id")?,
                    content: row.try_get("content")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn remove_activity_logs(&self, content_id: Uuid) -> BoardResult<u64> {
        let result = sqlx::query("DELETE FROM activity_logs WHERE content_id = $1")
            .bind(content_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

const HISTORY_COLUMNS: &str =
    "id, content_type, total, success, failed, percentage, status, ids, error_msgs";

#[async_trait]
impl ImportHistoryStore for PgBoardStore {
    async fn insert_import_history(&self, history: ImportHistory) -> BoardResult<()> {
        sqlx::query(&format!(
            "INSERT INTO import_histories ({HISTORY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(history.id)
        .bind(&history.content_type)
        .bind(to_i64(history.total))
        .bind(to_i64(history.success))
        .bind(to_i64(history.failed))
        .bind(history.percentage)
        .bind(history.status.as_str())
        .bind(&history.ids)
        .bind(&history.error_msgs)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_import_history(&self, id: Uuid) -> BoardResult<Option<ImportHistory>> {
        sqlx::query(&format!(
            "SELECT {HISTORY_COLUMNS} FROM import_histories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .as_ref()
        .map(Self::history_from_row)
        .transpose()
    }

    async fn apply_import_increment(
        &self,
        id: Uuid,
        increment: ImportIncrement,
    ) -> BoardResult<ImportHistory> {
        let row = sqlx::query(&format!(
            "UPDATE import_histories SET \
             success = success + $2, failed = failed + $3, percentage = percentage + $4, \
             ids = CASE WHEN $5::uuid IS NULL THEN ids ELSE array_append(ids, $5::uuid) END, \
             error_msgs = error_msgs || $6::text[] \
             WHERE id = $1 RETURNING {HISTORY_COLUMNS}"
        ))
        .bind(id)
        .bind(to_i64(increment.success))
        .bind(to_i64(increment.failed))
        .bind(increment.percentage)
        .bind(increment.created_id)
        .bind(&increment.error_msgs)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BoardError::not_found("Import history", id))?;

        Self::history_from_row(&row)
    }

    async fn set_import_status(
        &self,
        id: Uuid,
        status: ImportStatus,
        percentage: Option<f64>,
    ) -> BoardResult<ImportHistory> {
        let row = sqlx::query(&format!(
            "UPDATE import_histories SET status = $2, percentage = COALESCE($3, percentage) \
             WHERE id = $1 RETURNING {HISTORY_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(percentage)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BoardError::not_found("Import history", id))?;

        Self::history_from_row(&row)
    }
}
