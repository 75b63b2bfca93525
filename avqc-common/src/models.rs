//! Package and rights statement models
//!
//! A `Package` is one digitized audio/video item moving through
//! discovery → review → disposition. Lifecycle: PENDING → APPROVED or
//! PENDING → REJECTED; both dispositions are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Package media type, derived from the master file layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PackageType {
    Audio,
    Video,
}

impl PackageType {
    /// Extension of the primary `<refid>.<ext>` file identifying this type
    pub fn primary_extension(self) -> &'static str {
        match self {
            PackageType::Audio => "mp3",
            PackageType::Video => "mp4",
        }
    }

    /// Extension of access (derivative) files
    pub fn access_extension(self) -> &'static str {
        match self {
            PackageType::Audio => "mp3",
            PackageType::Video => "mp4",
        }
    }

    /// Extension of master (preservation) files
    pub fn master_extension(self) -> &'static str {
        match self {
            PackageType::Audio => "wav",
            PackageType::Video => "mkv",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PackageType::Audio => "AUDIO",
            PackageType::Video => "VIDEO",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUDIO" => Ok(PackageType::Audio),
            "VIDEO" => Ok(PackageType::Video),
            other => Err(Error::InvalidValue(format!("unknown package type '{}'", other))),
        }
    }
}

/// Review lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProcessStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessStatus::Pending => "PENDING",
            ProcessStatus::Approved => "APPROVED",
            ProcessStatus::Rejected => "REJECTED",
        }
    }

    /// Approved and rejected packages are never transitioned again
    pub fn is_terminal(self) -> bool {
        !matches!(self, ProcessStatus::Pending)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ProcessStatus::Pending),
            "APPROVED" => Ok(ProcessStatus::Approved),
            "REJECTED" => Ok(ProcessStatus::Rejected),
            other => Err(Error::InvalidValue(format!("unknown process status '{}'", other))),
        }
    }
}

/// Descriptive metadata copied from the archival registry.
///
/// Denormalized onto the package and overwritten on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub title: String,
    pub object_uri: String,
    pub resource_title: String,
    pub resource_uri: String,
    /// True when the archival object carries begin/end dates
    pub has_structured_dates: bool,
}

/// Technical summary computed at discovery time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSummary {
    /// Summed duration of access files, in seconds
    pub duration_access: f64,
    /// Summed duration of master files, in seconds
    pub duration_master: f64,
    pub multiple_masters: bool,
}

/// Values for a package record that does not exist yet
#[derive(Debug, Clone)]
pub struct NewPackage {
    pub refid: String,
    pub metadata: PackageMetadata,
    pub package_type: PackageType,
    pub summary: TechnicalSummary,
    pub possible_duplicate: bool,
}

/// Persisted package record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: i64,
    pub refid: String,
    pub title: String,
    pub object_uri: String,
    pub resource_title: String,
    pub resource_uri: String,
    pub package_type: PackageType,
    pub duration_access: f64,
    pub duration_master: f64,
    pub multiple_masters: bool,
    pub undated_object: bool,
    /// Set once at discovery: an APPROVED record with this refid already existed
    pub possible_duplicate: bool,
    pub process_status: ProcessStatus,
    /// Comma-joined rights statement ids, set on approval
    pub rights_ids: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Package {
    /// Overwrite the registry-derived fields
    pub fn apply_metadata(&mut self, metadata: &PackageMetadata) {
        self.title = metadata.title.clone();
        self.object_uri = metadata.object_uri.clone();
        self.resource_title = metadata.resource_title.clone();
        self.resource_uri = metadata.resource_uri.clone();
        self.undated_object = !metadata.has_structured_dates;
    }

    /// Link to the archival object inside its resource tree in the public
    /// registry UI, e.g. `{base}/resources/12#tree::archival_object_345`
    pub fn archival_object_link(&self, public_url: &str) -> String {
        let resource_id = self.resource_uri.rsplit('/').next().unwrap_or_default();
        let object_id = self.object_uri.rsplit('/').next().unwrap_or_default();
        format!(
            "{}/resources/{}#tree::archival_object_{}",
            public_url.trim_end_matches('/'),
            resource_id,
            object_id
        )
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.refid, self.title)
    }
}

/// Cached mirror of a rights registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RightsStatement {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub last_modified: DateTime<Utc>,
}
