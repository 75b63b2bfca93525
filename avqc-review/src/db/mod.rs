//! PackageStore: persistence for packages and rights statements
//!
//! Plain async functions over a shared `SqlitePool`. Schema creation lives in
//! `avqc_common::db`.

pub mod packages;
pub mod rights_statements;

pub use avqc_common::db::init_database;
