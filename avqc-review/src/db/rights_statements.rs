//! Rights statement database operations
//!
//! Rows are created once per external id and never updated.

use avqc_common::models::RightsStatement;
use avqc_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// Is a rights statement with this external id already stored?
pub async fn rights_statement_exists(pool: &SqlitePool, external_id: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rights_statements WHERE external_id = ?)")
            .bind(external_id)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Insert a rights statement
pub async fn insert_rights_statement(
    pool: &SqlitePool,
    external_id: &str,
    title: &str,
) -> Result<RightsStatement> {
    let last_modified = Utc::now();

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO rights_statements (external_id, title, last_modified)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(external_id)
    .bind(title)
    .bind(last_modified.to_rfc3339())
    .fetch_one(pool)
    .await?;

    Ok(RightsStatement {
        id,
        external_id: external_id.to_string(),
        title: title.to_string(),
        last_modified,
    })
}

/// Load all rights statements ordered by title
pub async fn list_rights_statements(pool: &SqlitePool) -> Result<Vec<RightsStatement>> {
    let rows = sqlx::query(
        "SELECT id, external_id, title, last_modified FROM rights_statements ORDER BY title, id",
    )
    .fetch_all(pool)
    .await?;

    let mut statements = Vec::with_capacity(rows.len());
    for row in rows {
        let last_modified: String = row.try_get("last_modified")?;
        let last_modified = DateTime::parse_from_rfc3339(&last_modified)
            .map_err(|e| Error::InvalidValue(format!("timestamp '{}': {}", last_modified, e)))?
            .with_timezone(&Utc);

        statements.push(RightsStatement {
            id: row.try_get("id")?,
            external_id: row.try_get("external_id")?,
            title: row.try_get("title")?,
            last_modified,
        });
    }

    Ok(statements)
}
