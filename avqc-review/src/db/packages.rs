//! Package database operations
//!
//! Only discovery and the lifecycle controller write packages.

use avqc_common::models::{NewPackage, Package, ProcessStatus};
use avqc_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

const PACKAGE_COLUMNS: &str = "id, refid, title, object_uri, resource_title, resource_uri, \
     package_type, duration_access, duration_master, multiple_masters, undated_object, \
     possible_duplicate, process_status, rights_ids, created_at, updated_at";

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidValue(format!("timestamp '{}': {}", value, e)))
}

fn package_from_row(row: &SqliteRow) -> Result<Package> {
    let package_type: String = row.try_get("package_type")?;
    let process_status: String = row.try_get("process_status")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Package {
        id: row.try_get("id")?,
        refid: row.try_get("refid")?,
        title: row.try_get("title")?,
        object_uri: row.try_get("object_uri")?,
        resource_title: row.try_get("resource_title")?,
        resource_uri: row.try_get("resource_uri")?,
        package_type: package_type.parse()?,
        duration_access: row.try_get("duration_access")?,
        duration_master: row.try_get("duration_master")?,
        multiple_masters: row.try_get("multiple_masters")?,
        undated_object: row.try_get("undated_object")?,
        possible_duplicate: row.try_get("possible_duplicate")?,
        process_status: process_status.parse()?,
        rights_ids: row.try_get("rights_ids")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Insert a new PENDING package and return the stored record
pub async fn insert_package(pool: &SqlitePool, new: &NewPackage) -> Result<Package> {
    let now = Utc::now().to_rfc3339();

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO packages (
            refid, title, object_uri, resource_title, resource_uri,
            package_type, duration_access, duration_master, multiple_masters,
            undated_object, possible_duplicate, process_status, rights_ids,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&new.refid)
    .bind(&new.metadata.title)
    .bind(&new.metadata.object_uri)
    .bind(&new.metadata.resource_title)
    .bind(&new.metadata.resource_uri)
    .bind(new.package_type.as_str())
    .bind(new.summary.duration_access)
    .bind(new.summary.duration_master)
    .bind(new.summary.multiple_masters)
    .bind(!new.metadata.has_structured_dates)
    .bind(new.possible_duplicate)
    .bind(ProcessStatus::Pending.as_str())
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await?;

    get_package(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("package {} vanished after insert", id)))
}

/// Load one package by id
pub async fn get_package(pool: &SqlitePool, id: i64) -> Result<Option<Package>> {
    let row = sqlx::query(&format!("SELECT {} FROM packages WHERE id = ?", PACKAGE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(package_from_row).transpose()
}

/// Load the packages with the given ids, ordered by id. Unknown ids are skipped.
pub async fn get_packages(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Package>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM packages WHERE id IN (", PACKAGE_COLUMNS));
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY id");

    let rows = builder.build().fetch_all(pool).await?;
    rows.iter().map(package_from_row).collect()
}

/// Load all packages with a given status, oldest first
pub async fn list_by_status(pool: &SqlitePool, status: ProcessStatus) -> Result<Vec<Package>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM packages WHERE process_status = ? ORDER BY id",
        PACKAGE_COLUMNS
    ))
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter().map(package_from_row).collect()
}

/// Load every record for a refid, oldest first
pub async fn list_by_refid(pool: &SqlitePool, refid: &str) -> Result<Vec<Package>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM packages WHERE refid = ? ORDER BY id",
        PACKAGE_COLUMNS
    ))
    .bind(refid)
    .fetch_all(pool)
    .await?;

    rows.iter().map(package_from_row).collect()
}

/// Does a record with this refid and status exist?
///
/// Used for the PENDING existence check and for duplicate detection
/// (an APPROVED record with the same refid).
pub async fn exists_with_status(
    pool: &SqlitePool,
    refid: &str,
    status: ProcessStatus,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM packages WHERE refid = ? AND process_status = ?)",
    )
    .bind(refid)
    .bind(status.as_str())
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Persist all mutable fields of a package and bump `updated_at`.
///
/// `possible_duplicate`, `refid`, type and technical summary are fixed at
/// discovery and never rewritten.
pub async fn save_package(pool: &SqlitePool, package: &mut Package) -> Result<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE packages SET
            title = ?,
            object_uri = ?,
            resource_title = ?,
            resource_uri = ?,
            undated_object = ?,
            process_status = ?,
            rights_ids = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&package.title)
    .bind(&package.object_uri)
    .bind(&package.resource_title)
    .bind(&package.resource_uri)
    .bind(package.undated_object)
    .bind(package.process_status.as_str())
    .bind(&package.rights_ids)
    .bind(now.to_rfc3339())
    .bind(package.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("package {}", package.id)));
    }

    package.updated_at = now;
    Ok(())
}

/// Count all package records
pub async fn count_packages(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM packages")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
