//! `mmrepquota` decoding.
//!
//! # Examples
//!
//! ```
//! use mmbeat::parse::{decode, Command};
//! use mmbeat::record::Record;
//!
//! let output = "\
//! mmrepquota::HEADER:version:reserved:reserved:filesystemName:quotaType:id:name:filesetname:blockUsage:blockQuota:blockLimit:blockInDoubt:blockGrace:filesUsage:filesQuota:filesLimit:filesInDoubt:filesGrace:
//! mmrepquota::0:1:::gpfs1:FILESET:1:work::1024:2048:4096:0:none:10:20:40:0:none:
//! ";
//!
//! let decoded = decode(Command::RepQuota, output);
//!
//! let Some(Record::Quota(quota)) = decoded.records.first() else {
//!     panic!("expected a quota record");
//! };
//!
//! assert_eq!(quota.fileset(), "work");
//! ```

use std::fmt;
use std::str::FromStr;

use serde_json::json;

use crate::error::DecodeError;
use crate::parse::Row;
use crate::record::{Attributes, Event, Record, attributes};

/// Quota entry.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Quota {
    filesystem: String,
    fileset: String,
    kind: Kind,
    entity: String,
    block: Metrics,
    files: Metrics,
}

impl Quota {
    /// Returns the file system name.
    #[must_use]
    pub fn filesystem(&self) -> &str {
        &self.filesystem
    }

    /// Returns the name of the fileset that contains this entry.
    ///
    /// For [`Kind::Fileset`] entries this is the fileset itself.
    #[must_use]
    pub fn fileset(&self) -> &str {
        &self.fileset
    }

    /// Returns the quota type.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns the user/group/fileset name (depending on [`Kind`]).
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns the block quota.
    #[must_use]
    pub const fn block(&self) -> &Metrics {
        &self.block
    }

    /// Returns the files quota.
    #[must_use]
    pub const fn files(&self) -> &Metrics {
        &self.files
    }

    /// Fileset entries never carry a usable fileset name. Their entity is
    /// the fileset, which links them to the user and group entries inside.
    fn link(mut self) -> Self {
        if self.kind == Kind::Fileset {
            self.fileset.clone_from(&self.entity);
        }

        self
    }
}

/// Quota metrics. The values are in kilobytes for block quotas and in number
/// of files for file quotas.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Metrics {
    usage: i64,
    soft: i64,
    hard: i64,
    in_doubt: i64,
    grace: String,
}

impl Metrics {
    /// Returns the current usage.
    #[must_use]
    pub const fn usage(&self) -> i64 {
        self.usage
    }

    /// Returns the soft quota limit.
    #[must_use]
    pub const fn soft(&self) -> i64 {
        self.soft
    }

    /// Returns the hard quota limit.
    #[must_use]
    pub const fn hard(&self) -> i64 {
        self.hard
    }

    /// Returns the in doubt amount.
    #[must_use]
    pub const fn in_doubt(&self) -> i64 {
        self.in_doubt
    }

    /// Returns the grace period, e.g. `none` or `7 days`.
    #[must_use]
    pub fn grace(&self) -> &str {
        &self.grace
    }
}

/// Quota type.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Kind {
    /// Fileset quota.
    Fileset,

    /// Group quota.
    Group,

    /// User quota.
    User,
}

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FILESET" => Ok(Self::Fileset),
            "GRP" => Ok(Self::Group),
            "USR" => Ok(Self::User),
            unknown => Err(UnknownKind(unknown.into())),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = match self {
            Self::Fileset => "FILESET",
            Self::Group => "GRP",
            Self::User => "USR",
        };

        write!(f, "{r}")
    }
}

/// Error parsing a quota [`Kind`].
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown quota type: {0}")]
pub struct UnknownKind(String);

// ----------------------------------------------------------------------------
// events
// ----------------------------------------------------------------------------

impl Event for Quota {
    fn event_type(&self) -> &'static str {
        "quota"
    }

    fn to_event(&self) -> Attributes {
        attributes([
            ("filesystem", json!(self.filesystem)),
            ("fileset", json!(self.fileset)),
            ("kind", json!(self.kind.to_string())),
            ("entity", json!(self.entity)),
            ("block_usage", json!(self.block.usage)),
            ("block_soft", json!(self.block.soft)),
            ("block_hard", json!(self.block.hard)),
            ("block_doubt", json!(self.block.in_doubt)),
            ("block_expired", json!(self.block.grace)),
            ("files_usage", json!(self.files.usage)),
            ("files_soft", json!(self.files.soft)),
            ("files_hard", json!(self.files.hard)),
            ("files_doubt", json!(self.files.in_doubt)),
            ("files_expired", json!(self.files.grace)),
        ])
    }

    fn tag_device(&mut self, _device: &str) {}
}

// ----------------------------------------------------------------------------
// boiler-platy parsing
// ----------------------------------------------------------------------------

pub(crate) fn decode(row: &Row<'_, '_>) -> Result<Record, DecodeError> {
    let quota = Quota {
        filesystem: row.string("filesystemName")?,
        fileset: row.string("filesetname")?,
        kind: row.parse("quotaType")?,
        entity: row.string("name")?,
        block: Metrics::from_row(row, "block")?,
        files: Metrics::from_row(row, "files")?,
    };

    Ok(quota.link().into())
}

impl Metrics {
    fn from_row(row: &Row<'_, '_>, resource: &str) -> Result<Self, DecodeError> {
        Ok(Self {
            usage: row.int(&format!("{resource}Usage"))?,
            soft: row.int(&format!("{resource}Quota"))?,
            hard: row.int(&format!("{resource}Limit"))?,
            in_doubt: row.int(&format!("{resource}InDoubt"))?,
            grace: row.string(&format!("{resource}Grace"))?,
        })
    }
}

// ----------------------------------------------------------------------------
// tests
// ----------------------------------------------------------------------------
