//! # AV QC Common Library
//!
//! Shared code for the digitized AV quality-control services:
//! - Error type
//! - Configuration loading
//! - Database initialization
//! - Package and rights statement models
//! - Notification event types

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;

pub use config::Config;
pub use error::{Error, Result};
pub use events::{Notification, Outcome};
pub use models::{Package, PackageType, ProcessStatus, RightsStatement};
