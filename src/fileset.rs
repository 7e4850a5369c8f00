//! `mmlsfileset` decoding.

use chrono::NaiveDateTime;
use serde_json::json;

use crate::error::DecodeError;
use crate::parse::Row;
use crate::record::{Attributes, Event, Record, attributes, tag_once};
use crate::util::unescape;

/// Parent ID of filesets without a parent, i.e. the root fileset.
pub const NO_PARENT: i64 = -1;

/// Literals `mmlsfileset` prints as parent ID of the root fileset.
const NO_PARENT_MARKERS: [&str; 2] = ["--", "-"];

/// Literal `mmlsfileset` uses for a set flag.
const YES: &str = "1";

/// A fileset.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Fileset {
    device: Option<String>,
    version: i64,
    filesystem_name: String,
    fileset_name: String,
    id: i64,
    root_inode: i64,
    status: String,
    path: String,
    parent_id: i64,
    created: NaiveDateTime,
    comment: String,
    mode: String,
    inode_space: InodeSpace,
    perm_change_flag: String,
}

/// Inode space bookkeeping of a fileset.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct InodeSpace {
    id: i64,
    is_owner: bool,
    max_inodes: i64,
    alloc_inodes: i64,
    free_inodes: i64,
    mask: i64,
    snap_id: i64,
}

impl Fileset {
    /// Returns the device this fileset was listed for, once tagged.
    #[must_use]
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Returns the record version.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// Returns the filesystem name.
    #[must_use]
    pub fn filesystem_name(&self) -> &str {
        &self.filesystem_name
    }

    /// Returns the fileset name.
    #[must_use]
    pub fn fileset_name(&self) -> &str {
        &self.fileset_name
    }

    /// Returns the fileset ID.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Returns the root inode.
    #[must_use]
    pub const fn root_inode(&self) -> i64 {
        self.root_inode
    }

    /// Returns the status, e.g. `Linked`.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Returns the junction path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the parent fileset ID, or [`NO_PARENT`].
    #[must_use]
    pub const fn parent_id(&self) -> i64 {
        self.parent_id
    }

    /// Returns the creation time.
    #[must_use]
    pub const fn created(&self) -> NaiveDateTime {
        self.created
    }

    /// Returns the comment.
    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Returns the fileset mode.
    #[must_use]
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Returns the inode space bookkeeping.
    #[must_use]
    pub const fn inode_space(&self) -> InodeSpace {
        self.inode_space
    }

    /// Returns the permission change flag.
    #[must_use]
    pub fn perm_change_flag(&self) -> &str {
        &self.perm_change_flag
    }
}

impl InodeSpace {
    /// Returns the inode space ID.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Returns `true` if the fileset owns its inode space.
    #[must_use]
    pub const fn is_owner(&self) -> bool {
        self.is_owner
    }

    /// Returns the maximum number of inodes.
    #[must_use]
    pub const fn max_inodes(&self) -> i64 {
        self.max_inodes
    }

    /// Returns the allocated inodes.
    #[must_use]
    pub const fn alloc_inodes(&self) -> i64 {
        self.alloc_inodes
    }

    /// Returns the free inodes.
    #[must_use]
    pub const fn free_inodes(&self) -> i64 {
        self.free_inodes
    }

    /// Returns the inode space mask.
    #[must_use]
    pub const fn mask(&self) -> i64 {
        self.mask
    }

    /// Returns the snapshot ID.
    #[must_use]
    pub const fn snap_id(&self) -> i64 {
        self.snap_id
    }
}

impl Event for Fileset {
    fn event_type(&self) -> &'static str {
        "fileset"
    }

    fn to_event(&self) -> Attributes {
        attributes([
            ("device", json!(self.device)),
            ("version", json!(self.version)),
            ("filesystem_name", json!(self.filesystem_name)),
            ("fileset_name", json!(self.fileset_name)),
            ("id", json!(self.id)),
            ("root_inode", json!(self.root_inode)),
            ("status", json!(self.status)),
            ("path", json!(self.path)),
            ("parent_id", json!(self.parent_id)),
            (
                "created",
                json!(self.created.format("%Y-%m-%dT%H:%M:%S").to_string()),
            ),
            ("comment", json!(self.comment)),
            ("fileset_mode", json!(self.mode)),
            ("inode_space", json!(self.inode_space.id)),
            ("is_inode_space_owner", json!(self.inode_space.is_owner)),
            ("max_inodes", json!(self.inode_space.max_inodes)),
            ("alloc_inodes", json!(self.inode_space.alloc_inodes)),
            ("free_inodes", json!(self.inode_space.free_inodes)),
            ("inode_space_mask", json!(self.inode_space.mask)),
            ("snap_id", json!(self.inode_space.snap_id)),
            ("perm_change_flag", json!(self.perm_change_flag)),
        ])
    }

    fn tag_device(&mut self, device: &str) {
        tag_once(&mut self.device, device);
    }
}

// ----------------------------------------------------------------------------
// boiler-platy parsing
// ----------------------------------------------------------------------------

pub(crate) fn decode(row: &Row<'_, '_>) -> Result<Record, DecodeError> {
    let parent_id = match row.raw("parentId")? {
        marker if NO_PARENT_MARKERS.contains(&marker) => NO_PARENT,
        _ => row.int("parentId")?,
    };

    let fileset = Fileset {
        device: None,
        version: row.int("version")?,
        filesystem_name: row.string("filesystemName")?,
        fileset_name: row.string("filesetName")?,
        id: row.int("id")?,
        root_inode: row.int("rootInode")?,
        status: row.string("status")?,
        path: unescape(row.raw("path")?).into_owned(),
        parent_id,
        created: row.timestamp("created")?,
        comment: unescape(row.raw("comment")?).into_owned(),
        mode: row.string("filesetMode")?,
        inode_space: InodeSpace {
            id: row.int("inodeSpace")?,
            is_owner: row.flag("isInodeSpaceOwner", YES)?,
            max_inodes: row.int("maxInodes")?,
            alloc_inodes: row.int("allocInodes")?,
            free_inodes: row.int("freeInodes")?,
            mask: row.int("inodeSpaceMask")?,
            snap_id: row.int("snapId")?,
        },
        perm_change_flag: row.string("permChangeFlag")?,
    };

    Ok(fileset.into())
}

// ----------------------------------------------------------------------------
// tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::parse::{Command, decode as decode_output};
    use crate::util::escape;

    fn filesets(input: &str) -> Vec<Fileset> {
        let decoded = decode_output(Command::LsFileset, input);
        assert_eq!(decoded.failures, vec![]);

        decoded
            .records
            .into_iter()
            .map(|record| match record {
                Record::Fileset(fileset) => fileset,
                other => panic!("unexpected record: {other:?}"),
            })
            .collect()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, s))
            .unwrap()
    }

    #[test]
    fn parse() {
        let input = include_str!("fileset-example.in");

        let mut it = filesets(input).into_iter();

        assert_eq!(
            it.next(),
            Some(Fileset {
                device: None,
                version: 1,
                filesystem_name: "gpfs1".into(),
                fileset_name: "root".into(),
                id: 0,
                root_inode: 3,
                status: "Linked".into(),
                path: "/gpfs1".into(),
                parent_id: NO_PARENT,
                created: at(2017, 2, 16, 12, 47, 18),
                comment: "root fileset".into(),
                mode: "off".into(),
                inode_space: InodeSpace {
                    id: 0,
                    is_owner: true,
                    max_inodes: 20_971_520,
                    alloc_inodes: 5_251_072,
                    free_inodes: 1_048_576,
                    mask: 0,
                    snap_id: 0,
                },
                perm_change_flag: "chmodAndSetacl".into(),
            })
        );

        assert_eq!(
            it.next(),
            Some(Fileset {
                device: None,
                version: 1,
                filesystem_name: "gpfs1".into(),
                fileset_name: "work".into(),
                id: 1,
                root_inode: 524_291,
                status: "Linked".into(),
                path: "/gpfs1/work".into(),
                parent_id: 0,
                created: at(2019, 11, 4, 9, 3, 59),
                comment: "a:b".into(),
                mode: "off".into(),
                inode_space: InodeSpace {
                    id: 1,
                    is_owner: true,
                    max_inodes: 295_313_408,
                    alloc_inodes: 260_063_232,
                    free_inodes: 35_250_176,
                    mask: 0,
                    snap_id: 0,
                },
                perm_change_flag: "chmodAndSetacl".into(),
            })
        );

        assert_eq!(it.next(), None);
    }

    #[test]
    fn path_round_trip() {
        let input = include_str!("fileset-example.in");

        let raw = input
            .lines()
            .nth(2)
            .and_then(|line| line.split(':').nth(11))
            .unwrap();

        assert_eq!(escape(filesets(input)[1].path()), raw);
    }

    #[test]
    fn bad_timestamp() {
        let input = include_str!("fileset-example.in")
            .replace("Mon Nov  4 09%3A03%3A59 2019", "2019-11-04");

        let decoded = decode_output(Command::LsFileset, &input);

        assert_eq!(decoded.records.len(), 1);
        assert_eq!(
            decoded.failures[0].source,
            DecodeError::FieldDecode {
                column: "created".into(),
                value: Some("2019-11-04".into()),
            }
        );
    }

    #[test]
    fn event() {
        let mut fileset = filesets(include_str!("fileset-example.in")).remove(1);
        fileset.tag_device("gpfs1");

        let event = fileset.to_event();

        assert_eq!(event["device"], "gpfs1");
        assert_eq!(event["path"], "/gpfs1/work");
        assert_eq!(event["created"], "2019-11-04T09:03:59");
        assert_eq!(event["parent_id"], 0);
        assert_eq!(event["is_inode_space_owner"], true);
    }
}
