//! Access log browsing and cleanup

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use backoffice_access_log::{store::MAX_PAGE_SIZE, LogFilter, PageRequest, StoredLog, TimeRange};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::info;

use crate::extract::{parse_id, ValidJson, ValidQuery};
use crate::handlers::{format_local, DATETIME_FORMAT};
use crate::models::{Ack, DeletedCount, IdsRequest, LogEntry, LogList};
use crate::response::{ok, ApiError, ApiResult, ErrorResponse};
use crate::AppState;

/// Decoded list/export query
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LogQuery {
    pub page: PageRequest,
    pub filter: LogFilter,
}

fn parse_page_number(key: &str, value: &str) -> Result<u64, ApiError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ApiError::bad_request(format!("invalid {}: {}", key, value)))
}

fn parse_local(value: &str, zone: &FixedOffset) -> Result<DateTime<Utc>, ApiError> {
    let invalid = || {
        ApiError::bad_request(format!(
            "invalid timestamp '{}', expected YYYY-MM-DD HH:MM:SS",
            value
        ))
    };

    let naive =
        NaiveDateTime::parse_from_str(value.trim(), DATETIME_FORMAT).map_err(|_| invalid())?;
    zone.from_local_datetime(&naive)
        .single()
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(invalid)
}

/// Turn raw query pairs into a page and filter.
///
/// `timestamp[]` (or `timestamp`) must appear exactly twice when present: start then end,
/// both wall-clock times in `zone`.
pub(crate) fn parse_log_query(
    pairs: &[(String, String)],
    zone: &FixedOffset,
) -> Result<LogQuery, ApiError> {
    let mut page = 1;
    let mut size = 10;
    let mut filter = LogFilter::default();
    let mut timestamps = Vec::new();

    for (key, value) in pairs {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            continue;
        }
        match key.as_str() {
            "pageNum" | "page" => page = parse_page_number(key, value)?,
            "pageSize" | "size" => size = parse_page_number(key, value)?,
            "timestamp[]" | "timestamp" => timestamps.push(trimmed),
            "method" => filter.method = Some(trimmed.to_ascii_uppercase()),
            "path" => filter.path = Some(trimmed.to_string()),
            "ip" => filter.ip = Some(trimmed.to_string()),
            "handler" => filter.handler = Some(trimmed.to_string()),
            "status" => {
                let status = trimmed
                    .parse::<u16>()
                    .map_err(|_| ApiError::bad_request(format!("invalid status: {}", value)))?;
                filter.status = (status != 0).then_some(status);
            }
            _ => {}
        }
    }

    match timestamps.as_slice() {
        [] => {}
        [start, end] => {
            let start = parse_local(start, zone)?;
            let end = parse_local(end, zone)?;
            if start > end {
                return Err(ApiError::bad_request(
                    "timestamp start must not be after end",
                ));
            }
            filter.time_range = Some(TimeRange { start, end });
        }
        _ => {
            return Err(ApiError::bad_request(
                "timestamp requires exactly two values: start and end",
            ))
        }
    }

    Ok(LogQuery {
        page: PageRequest::new(page, size),
        filter,
    })
}

/// List access logs, newest first
#[utoipa::path(
    get,
    path = "/api/system/log/list",
    params(
        ("pageNum" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("pageSize" = Option<u64>, Query, description = "Page size (default: 10)"),
        ("method" = Option<String>, Query, description = "HTTP method"),
        ("path" = Option<String>, Query, description = "Path substring"),
        ("status" = Option<u16>, Query, description = "Response status; 0 means any"),
        ("ip" = Option<String>, Query, description = "Client IP"),
        ("handler" = Option<String>, Query, description = "Handler substring"),
        ("timestamp[]" = Option<Vec<String>>, Query, description = "Start and end, YYYY-MM-DD HH:MM:SS")
    ),
    responses(
        (status = 200, description = "Page of log entries", body = LogList),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "logs"
)]
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    ValidQuery(pairs): ValidQuery<Vec<(String, String)>>,
) -> ApiResult<LogList> {
    let query = parse_log_query(&pairs, &state.timezone)?;
    let found = state.logs.list(query.page, &query.filter).await?;

    ok(LogList {
        rows: found.rows.into_iter().map(LogEntry::from).collect(),
        total: found.total,
        page: query.page.page,
        size: query.page.size,
    })
}

/// Get one access log
#[utoipa::path(
    get,
    path = "/api/system/log/{id}",
    params(("id" = i32, Path, description = "Log ID")),
    responses(
        (status = 200, description = "Log entry", body = LogEntry),
        (status = 400, description = "Invalid ID", body = ErrorResponse),
        (status = 404, description = "Log not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "logs"
)]
pub async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<LogEntry> {
    let id = parse_id(&id, "log")?;
    let stored = state
        .logs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("log not found"))?;
    ok(stored.into())
}

/// Delete one access log
#[utoipa::path(
    delete,
    path = "/api/system/log/{id}",
    params(("id" = i32, Path, description = "Log ID")),
    responses(
        (status = 200, description = "Log deleted", body = Ack),
        (status = 404, description = "Log not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "logs"
)]
pub async fn delete_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Ack> {
    let id = parse_id(&id, "log")?;
    if !state.logs.delete(id).await? {
        return Err(ApiError::not_found("log not found"));
    }
    ok(Ack::new())
}

/// Delete several access logs
#[utoipa::path(
    delete,
    path = "/api/system/log",
    request_body = IdsRequest,
    responses(
        (status = 200, description = "Logs deleted", body = DeletedCount),
        (status = 400, description = "No ids given", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "logs"
)]
pub async fn batch_delete_logs(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<IdsRequest>,
) -> ApiResult<DeletedCount> {
    if req.ids.is_empty() {
        return Err(ApiError::bad_request("ids must not be empty"));
    }

    let deleted = state.logs.delete_many(&req.ids).await?;
    info!("Deleted {} access logs", deleted);
    ok(DeletedCount { deleted })
}

/// Delete every access log
#[utoipa::path(
    delete,
    path = "/api/system/log/clean",
    responses(
        (status = 200, description = "Logs deleted", body = DeletedCount)
    ),
    security(("bearer_auth" = [])),
    tag = "logs"
)]
pub async fn clean_logs(State(state): State<Arc<AppState>>) -> ApiResult<DeletedCount> {
    let deleted = state.logs.delete_all().await?;
    info!("Cleaned {} access logs", deleted);
    ok(DeletedCount { deleted })
}

fn export_line(out: &mut String, stored: &StoredLog, zone: &FixedOffset) {
    let record = &stored.record;
    let _ = writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}ms\t{}\t{}",
        format_local(record.timestamp, zone),
        record.method,
        record.path,
        record.status,
        record.ip,
        record.latency_ms(),
        record.handler,
        record.errors.replace('\n', " | "),
    );
}

/// Export matching access logs as a text attachment
#[utoipa::path(
    post,
    path = "/api/system/log/export",
    params(
        ("method" = Option<String>, Query, description = "HTTP method"),
        ("path" = Option<String>, Query, description = "Path substring"),
        ("status" = Option<u16>, Query, description = "Response status; 0 means any"),
        ("ip" = Option<String>, Query, description = "Client IP"),
        ("handler" = Option<String>, Query, description = "Handler substring"),
        ("timestamp[]" = Option<Vec<String>>, Query, description = "Start and end, YYYY-MM-DD HH:MM:SS")
    ),
    responses(
        (status = 200, description = "One line per log entry", content_type = "text/plain", body = String),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "logs"
)]
pub async fn export_logs(
    State(state): State<Arc<AppState>>,
    ValidQuery(pairs): ValidQuery<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let query = parse_log_query(&pairs, &state.timezone)?;

    let mut out = String::from("time\tmethod\tpath\tstatus\tip\tlatency\thandler\terrors\n");
    let mut page = PageRequest::new(1, MAX_PAGE_SIZE);
    let mut written = 0u64;
    loop {
        let found = state.logs.list(page, &query.filter).await?;
        if found.rows.is_empty() {
            break;
        }
        for stored in &found.rows {
            export_line(&mut out, stored, &state.timezone);
        }
        written += found.rows.len() as u64;
        if written >= found.total {
            break;
        }
        page = PageRequest::new(page.page + 1, MAX_PAGE_SIZE);
    }

    info!("Exported {} access logs", written);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=logs.txt",
            ),
        ],
        out,
    )
        .into_response())
}
