//! Log storage backed by the `logs` table

use async_trait::async_trait;
use backoffice_access_log::{
    CapturedBody, LogFilter, LogPage, LogRecord, LogSink, LogStore, PageRequest, StoreError,
    StoredLog,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
    ActiveValue::Set,
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use std::time::Duration;
use tracing::debug;

use crate::entities::access_log::{self, Column, Entity as AccessLog};

/// Rows per INSERT statement; keeps bind parameters under every backend's limit
const INSERT_CHUNK: usize = 500;

/// `LOWER(column) LIKE '%needle%'` with `%`, `_` and `\` in the needle escaped,
/// so it matches the same rows as [`LogFilter::matches`].
fn literal_contains(column: Column, needle: &str) -> SimpleExpr {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_ascii_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');

    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

/// [`LogStore`] over a sea-orm connection. Deletes are soft.
#[derive(Clone)]
pub struct SeaOrmLogStore {
    db: DatabaseConnection,
}

impl SeaOrmLogStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn live() -> Condition {
        Condition::all().add(Column::DeletedAt.is_null())
    }

    /// Mark matching rows deleted. `condition` must include [`Self::live`].
    async fn soft_delete(&self, condition: Condition) -> Result<u64, StoreError> {
        let now = Utc::now();
        let result = AccessLog::update_many()
            .col_expr(Column::DeletedAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(condition)
            .exec(&self.db)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected)
    }
}

fn backend(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn encode_body(body: Option<&CapturedBody>) -> Result<Option<String>, StoreError> {
    Ok(body.map(serde_json::to_string).transpose()?)
}

fn decode_body(text: Option<String>) -> Option<CapturedBody> {
    let text = text?;
    // Rows written by other tools may hold plain text
    Some(serde_json::from_str(&text).unwrap_or(CapturedBody::Raw(text)))
}

fn to_active_model(
    record: LogRecord,
    now: DateTime<Utc>,
) -> Result<access_log::ActiveModel, StoreError> {
    let latency_ms = record.latency_ms();
    let request = encode_body(record.request.as_ref())?;
    let response = encode_body(record.response.as_ref())?;

    Ok(access_log::ActiveModel {
        timestamp: Set(record.timestamp),
        method: Set(record.method),
        path: Set(record.path),
        query: Set(record.query),
        ip: Set(record.ip),
        user_agent: Set(record.user_agent),
        status: Set(i32::from(record.status)),
        latency_ms: Set(latency_ms),
        handler: Set(record.handler),
        request: Set(request),
        response: Set(response),
        errors: Set(record.errors),
        content_length: Set(record.content_length),
        truncated: Set(record.truncated),
        created_at: Set(record.created_at),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    })
}

fn to_stored(model: access_log::Model) -> StoredLog {
    StoredLog {
        id: model.id,
        record: LogRecord {
            timestamp: model.timestamp,
            method: model.method,
            path: model.path,
            query: model.query,
            ip: model.ip,
            user_agent: model.user_agent,
            status: u16::try_from(model.status).unwrap_or_default(),
            latency: Duration::from_millis(u64::try_from(model.latency_ms).unwrap_or_default()),
            handler: model.handler,
            request: decode_body(model.request),
            response: decode_body(model.response),
            errors: model.errors,
            content_length: model.content_length,
            truncated: model.truncated,
            created_at: model.created_at,
        },
        updated_at: model.updated_at,
    }
}

#[async_trait]
impl LogSink for SeaOrmLogStore {
    async fn persist_batch(&self, records: Vec<LogRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let count = records.len();
        let now = Utc::now();
        let models = records
            .into_iter()
            .map(|record| to_active_model(record, now))
            .collect::<Result<Vec<_>, _>>()?;

        let txn = self.db.begin().await.map_err(backend)?;
        let mut rows = models.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk: Vec<_> = rows.by_ref().take(INSERT_CHUNK).collect();
            AccessLog::insert_many(chunk)
                .exec_without_returning(&txn)
                .await
                .map_err(backend)?;
        }
        txn.commit().await.map_err(backend)?;

        debug!(count, "Inserted log records");
        Ok(())
    }
}

#[async_trait]
impl LogStore for SeaOrmLogStore {
    async fn get(&self, id: i32) -> Result<Option<StoredLog>, StoreError> {
        let model = AccessLog::find_by_id(id)
            .filter(Self::live())
            .one(&self.db)
            .await
            .map_err(backend)?;

        Ok(model.map(to_stored))
    }

    async fn list(&self, page: PageRequest, filter: &LogFilter) -> Result<LogPage, StoreError> {
        let mut condition = Self::live();

        if let Some(method) = &filter.method {
            condition = condition.add(Column::Method.eq(method.to_uppercase()));
        }

        if let Some(path) = &filter.path {
            condition = condition.add(literal_contains(Column::Path, path));
        }

        if let Some(status) = filter.status {
            condition = condition.add(Column::Status.eq(i32::from(status)));
        }

        if let Some(ip) = &filter.ip {
            condition = condition.add(Column::Ip.eq(ip.as_str()));
        }

        if let Some(handler) = &filter.handler {
            condition = condition.add(literal_contains(Column::Handler, handler));
        }

        if let Some(range) = &filter.time_range {
            condition = condition.add(Column::Timestamp.between(range.start, range.end));
        }

        let paginator = AccessLog::find()
            .filter(condition)
            .order_by_desc(Column::Timestamp)
            .order_by_desc(Column::Id)
            .paginate(&self.db, page.size);

        let total = paginator.num_items().await.map_err(backend)?;
        let rows = paginator
            .fetch_page(page.index())
            .await
            .map_err(backend)?
            .into_iter()
            .map(to_stored)
            .collect();

        Ok(LogPage { rows, total })
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let removed = self
            .soft_delete(Self::live().add(Column::Id.eq(id)))
            .await?;
        Ok(removed > 0)
    }

    async fn delete_many(&self, ids: &[i32]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.soft_delete(Self::live().add(Column::Id.is_in(ids.iter().copied())))
            .await
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        self.soft_delete(Self::live()).await
    }
}
