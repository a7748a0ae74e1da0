//! Log query endpoints
//!
//! Paginated, filtered access to stored log entries plus the per-country
//! summary used by the dashboard.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::{AppError, AppResult, AppState};

const MAX_PAGE_SIZE: i64 = 1000;

fn default_limit() -> i64 {
    100
}

/// Query parameters for `GET /logs/`
#[derive(Debug, Clone, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub domain: Option<String>,
    pub status_code: Option<i32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

impl LogsQuery {
    fn validate(&self) -> Result<(), AppError> {
        if self.skip < 0 {
            return Err(AppError::BadRequest("skip must not be negative".to_string()));
        }
        if self.limit < 1 || self.limit > MAX_PAGE_SIZE {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }
}

/// One stored log entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LogEntryRow {
    pub id: i64,
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
    pub status_code: Option<i32>,
    pub country: Option<String>,
    pub request_path: Option<String>,
    pub domain: Option<String>,
    pub raw_log: String,
}

/// Response for `GET /logs/`
#[derive(Debug, Serialize)]
pub struct PaginatedLogResponse {
    pub logs: Vec<LogEntryRow>,
    pub total_count: i64,
}

/// One row of the per-country summary
#[derive(Debug, Serialize)]
pub struct CountrySummary {
    pub country: String,
    pub count: i64,
}

/// Sortable columns; anything else falls back to the timestamp
fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("id") => "id",
        Some("ip_address") => "ip_address",
        Some("status_code") => "status_code",
        Some("country") => "country",
        Some("domain") => "domain",
        Some("request_path") => "request_path",
        _ => "timestamp",
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &LogsQuery) {
    let mut separated = false;
    let mut push_clause = |builder: &mut QueryBuilder<'_, Postgres>| {
        if separated {
            builder.push(" AND ");
        } else {
            builder.push(" WHERE ");
            separated = true;
        }
    };

    if let Some(ref ip_address) = query.ip_address {
        push_clause(builder);
        builder
            .push("ip_address ILIKE ")
            .push_bind(format!("%{}%", ip_address));
    }
    if let Some(ref country) = query.country {
        push_clause(builder);
        builder
            .push("country ILIKE ")
            .push_bind(format!("%{}%", country));
    }
    if let Some(ref domain) = query.domain {
        push_clause(builder);
        builder
            .push("domain ILIKE ")
            .push_bind(format!("%{}%", domain));
    }
    if let Some(status_code) = query.status_code {
        push_clause(builder);
        builder.push("status_code = ").push_bind(status_code);
    }
}

/// `GET /logs/` - paginated, filtered log listing
#[tracing::instrument(skip(state))]
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> AppResult<Json<PaginatedLogResponse>> {
    query.validate()?;

    let mut count_builder: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM log_entries");
    push_filters(&mut count_builder, &query);
    let total_count: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&state.db)
        .await?;

    let direction = match query.sort_dir.as_deref() {
        Some("asc") => "ASC",
        _ => "DESC",
    };

    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "SELECT id, ip_address, timestamp, status_code, country, request_path, domain, raw_log \
         FROM log_entries",
    );
    push_filters(&mut builder, &query);
    builder.push(" ORDER BY ");
    builder.push(sort_column(query.sort_by.as_deref()));
    builder.push(" ");
    builder.push(direction);
    builder.push(" OFFSET ").push_bind(query.skip);
    builder.push(" LIMIT ").push_bind(query.limit);

    let logs: Vec<LogEntryRow> = builder.build_query_as().fetch_all(&state.db).await?;

    Ok(Json(PaginatedLogResponse { logs, total_count }))
}

/// `GET /logs/summary/by-country/` - accesses grouped by country
#[tracing::instrument(skip(state))]
pub async fn summary_by_country(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CountrySummary>>> {
    let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
        "SELECT country, COUNT(*) FROM log_entries GROUP BY country ORDER BY COUNT(*) DESC",
    )
    .fetch_all(&state.db)
    .await?;

    let summary = rows
        .into_iter()
        .map(|(country, count)| CountrySummary {
            country: country.unwrap_or_else(|| "Unknown".to_string()),
            count,
        })
        .collect();

    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_query() -> LogsQuery {
        LogsQuery {
            skip: 0,
            limit: 100,
            ip_address: None,
            country: None,
            domain: None,
            status_code: None,
            sort_by: None,
            sort_dir: None,
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(base_query().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_skip() {
        let mut query = base_query();
        query.skip = -1;
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_validate_clamps_limit_range() {
        let mut query = base_query();
        query.limit = 0;
        assert!(query.validate().is_err());
        query.limit = MAX_PAGE_SIZE + 1;
        assert!(query.validate().is_err());
        query.limit = MAX_PAGE_SIZE;
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_sort_column_whitelist() {
        assert_eq!(sort_column(Some("country")), "country");
        assert_eq!(sort_column(Some("id")), "id");
        // Unknown or hostile input falls back to the timestamp column.
        assert_eq!(sort_column(Some("timestamp; DROP TABLE log_entries")), "timestamp");
        assert_eq!(sort_column(None), "timestamp");
    }
}
