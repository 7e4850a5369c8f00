//! `mmdf` decoding.
//!
//! One `mmdf` invocation mixes four record kinds, each announced by its own
//! header line: `nsd`, `poolTotal`, `fsTotal` and `inode`.

use serde_json::json;

use crate::error::DecodeError;
use crate::parse::Row;
use crate::record::{Attributes, Event, Record, attributes, tag_once};

/// Literal `mmdf` uses for a set flag.
const YES: &str = "Yes";

/// Disk space entry of a device.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct DiskSpace {
    device: Option<String>,
    usage: Usage,
}

impl DiskSpace {
    /// Returns the device this entry belongs to, once tagged.
    #[must_use]
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Returns the usage data.
    #[must_use]
    pub const fn usage(&self) -> &Usage {
        &self.usage
    }
}

impl From<Usage> for DiskSpace {
    fn from(usage: Usage) -> Self {
        Self {
            device: None,
            usage,
        }
    }
}

/// The kinds of `mmdf` entries.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Usage {
    /// Single NSD.
    Nsd(Nsd),

    /// Storage pool total.
    Pool(Pool),

    /// File system total.
    Filesystem(Filesystem),

    /// Inode summary.
    Inodes(Inodes),
}

/// Free blocks and fragments, shared by NSDs and totals. In kilobytes.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Free {
    blocks: i64,
    blocks_percent: i64,
    fragments: i64,
    fragments_percent: i64,
}

impl Free {
    /// Returns the free full blocks.
    #[must_use]
    pub const fn blocks(&self) -> i64 {
        self.blocks
    }

    /// Returns the free full blocks in percent.
    #[must_use]
    pub const fn blocks_percent(&self) -> i64 {
        self.blocks_percent
    }

    /// Returns the free fragments.
    #[must_use]
    pub const fn fragments(&self) -> i64 {
        self.fragments
    }

    /// Returns the free fragments in percent.
    #[must_use]
    pub const fn fragments_percent(&self) -> i64 {
        self.fragments_percent
    }
}

/// NSD entry.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Nsd {
    name: String,
    pool: String,
    size: i64,
    failure_group: String,
    holds_metadata: bool,
    holds_objectdata: bool,
    free: Free,
    available_for_alloc: String,
}

impl Nsd {
    /// Returns the NSD name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the storage pool.
    #[must_use]
    pub fn pool(&self) -> &str {
        &self.pool
    }

    /// Returns the disk size in kilobytes.
    #[must_use]
    pub const fn size(&self) -> i64 {
        self.size
    }

    /// Returns the failure group. This may be a topology vector like `1,0,2`.
    #[must_use]
    pub fn failure_group(&self) -> &str {
        &self.failure_group
    }

    /// Returns `true` if the NSD holds metadata.
    #[must_use]
    pub const fn holds_metadata(&self) -> bool {
        self.holds_metadata
    }

    /// Returns `true` if the NSD holds object data.
    #[must_use]
    pub const fn holds_objectdata(&self) -> bool {
        self.holds_objectdata
    }

    /// Returns the free space.
    #[must_use]
    pub const fn free(&self) -> Free {
        self.free
    }

    /// Returns whether the disk is available for allocation.
    #[must_use]
    pub fn available_for_alloc(&self) -> &str {
        &self.available_for_alloc
    }
}

/// Storage pool total.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Pool {
    name: String,
    size: i64,
    free: Free,
    max_disk_size: i64,
}

impl Pool {
    /// Returns the pool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the pool size in kilobytes.
    #[must_use]
    pub const fn size(&self) -> i64 {
        self.size
    }

    /// Returns the free space.
    #[must_use]
    pub const fn free(&self) -> Free {
        self.free
    }

    /// Returns the maximum disk size the pool supports in kilobytes.
    #[must_use]
    pub const fn max_disk_size(&self) -> i64 {
        self.max_disk_size
    }
}

/// File system total.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Filesystem {
    size: i64,
    free: Free,
}

impl Filesystem {
    /// Returns the file system size in kilobytes.
    #[must_use]
    pub const fn size(&self) -> i64 {
        self.size
    }

    /// Returns the free space.
    #[must_use]
    pub const fn free(&self) -> Free {
        self.free
    }
}

/// Inode summary.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Inodes {
    used: i64,
    free: i64,
    allocated: i64,
    max: i64,
}

impl Inodes {
    /// Returns the used inodes.
    #[must_use]
    pub const fn used(&self) -> i64 {
        self.used
    }

    /// Returns the free inodes.
    #[must_use]
    pub const fn free(&self) -> i64 {
        self.free
    }

    /// Returns the allocated inodes.
    #[must_use]
    pub const fn allocated(&self) -> i64 {
        self.allocated
    }

    /// Returns the maximum inodes.
    #[must_use]
    pub const fn max(&self) -> i64 {
        self.max
    }
}

// ----------------------------------------------------------------------------
// events
// ----------------------------------------------------------------------------

impl Event for DiskSpace {
    fn event_type(&self) -> &'static str {
        "df"
    }

    fn to_event(&self) -> Attributes {
        let mut event = match &self.usage {
            Usage::Nsd(nsd) => attributes([
                ("kind", json!("nsd")),
                ("nsd_name", json!(nsd.name)),
                ("storage_pool", json!(nsd.pool)),
                ("disk_size", json!(nsd.size)),
                ("failure_group", json!(nsd.failure_group)),
                ("metadata", json!(nsd.holds_metadata)),
                ("data", json!(nsd.holds_objectdata)),
                ("available_for_alloc", json!(nsd.available_for_alloc)),
            ]),
            Usage::Pool(pool) => attributes([
                ("kind", json!("pool_total")),
                ("pool_name", json!(pool.name)),
                ("pool_size", json!(pool.size)),
                ("max_disk_size", json!(pool.max_disk_size)),
            ]),
            Usage::Filesystem(fs) => attributes([
                ("kind", json!("fs_total")),
                ("fs_size", json!(fs.size)),
            ]),
            Usage::Inodes(inodes) => attributes([
                ("kind", json!("inode")),
                ("used_inodes", json!(inodes.used)),
                ("free_inodes", json!(inodes.free)),
                ("allocated_inodes", json!(inodes.allocated)),
                ("max_inodes", json!(inodes.max)),
            ]),
        };

        let free = match &self.usage {
            Usage::Nsd(Nsd { free, .. })
            | Usage::Pool(Pool { free, .. })
            | Usage::Filesystem(Filesystem { free, .. }) => Some(free),
            Usage::Inodes(_) => None,
        };

        if let Some(free) = free {
            event.extend(attributes([
                ("free_blocks", json!(free.blocks)),
                ("free_blocks_percent", json!(free.blocks_percent)),
                ("free_fragments", json!(free.fragments)),
                ("free_fragments_percent", json!(free.fragments_percent)),
            ]));
        }

        event.insert("device".into(), json!(self.device));

        event
    }

    fn tag_device(&mut self, device: &str) {
        tag_once(&mut self.device, device);
    }
}

// ----------------------------------------------------------------------------
// boiler-platy parsing
// ----------------------------------------------------------------------------

pub(crate) fn decode_nsd(row: &Row<'_, '_>) -> Result<Record, DecodeError> {
    let nsd = Nsd {
        name: row.string("nsdName")?,
        pool: row.string("storagePool")?,
        size: row.int("diskSize")?,
        failure_group: row.string("failureGroup")?,
        holds_metadata: row.flag("metadata", YES)?,
        holds_objectdata: row.flag("data", YES)?,
        free: Free::from_row(row)?,
        available_for_alloc: row.string("diskAvailableForAlloc")?,
    };

    Ok(DiskSpace::from(Usage::Nsd(nsd)).into())
}

pub(crate) fn decode_pool(row: &Row<'_, '_>) -> Result<Record, DecodeError> {
    let pool = Pool {
        name: row.string("poolName")?,
        size: row.int("poolSize")?,
        free: Free::from_row(row)?,
        max_disk_size: row.int("maxDiskSize")?,
    };

    Ok(DiskSpace::from(Usage::Pool(pool)).into())
}

pub(crate) fn decode_filesystem(
    row: &Row<'_, '_>,
) -> Result<Record, DecodeError> {
    let fs = Filesystem {
        size: row.int("fsSize")?,
        free: Free::from_row(row)?,
    };

    Ok(DiskSpace::from(Usage::Filesystem(fs)).into())
}

pub(crate) fn decode_inodes(row: &Row<'_, '_>) -> Result<Record, DecodeError> {
    let inodes = Inodes {
        used: row.int("usedInodes")?,
        free: row.int("freeInodes")?,
        allocated: row.int("allocatedInodes")?,
        max: row.int("maxInodes")?,
    };

    Ok(DiskSpace::from(Usage::Inodes(inodes)).into())
}

impl Free {
    fn from_row(row: &Row<'_, '_>) -> Result<Self, DecodeError> {
        Ok(Self {
            blocks: row.int("freeBlocks")?,
            blocks_percent: row.int("freeBlocksPct")?,
            fragments: row.int("freeFragments")?,
            fragments_percent: row.int("freeFragmentsPct")?,
        })
    }
}

// ----------------------------------------------------------------------------
// tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{Command, decode as decode_output};

    fn usages(input: &str) -> Vec<Usage> {
        let decoded = decode_output(Command::Df, input);
        assert_eq!(decoded.failures, vec![]);

        decoded
            .records
            .into_iter()
            .map(|record| match record {
                Record::DiskSpace(DiskSpace { device: None, usage }) => usage,
                other => panic!("unexpected record: {other:?}"),
            })
            .collect()
    }

    #[test]
    fn parse() {
        let input = include_str!("df-example.in");

        let mut it = usages(input).into_iter();

        assert_eq!(
            it.next(),
            Some(Usage::Nsd(Nsd {
                name: "filer3_nvme02".into(),
                pool: "nvme".into(),
                size: 6_251_223_376,
                failure_group: "3".into(),
                holds_metadata: false,
                holds_objectdata: true,
                free: Free {
                    blocks: 2_703_523_840,
                    blocks_percent: 43,
                    fragments: 621_356_336,
                    fragments_percent: 10,
                },
                available_for_alloc: "up".into(),
            }))
        );

        assert_eq!(
            it.next(),
            Some(Usage::Nsd(Nsd {
                name: "filer1_meta01".into(),
                pool: "system".into(),
                size: 1_875_366_912,
                failure_group: "1,0,1".into(),
                holds_metadata: true,
                holds_objectdata: false,
                free: Free {
                    blocks: 1_290_543_104,
                    blocks_percent: 69,
                    fragments: 40_140_912,
                    fragments_percent: 2,
                },
                available_for_alloc: "up".into(),
            }))
        );

        assert_eq!(
            it.next(),
            Some(Usage::Pool(Pool {
                name: "system".into(),
                size: 50_009_787_008,
                free: Free {
                    blocks: 34_200_018_944,
                    blocks_percent: 68,
                    fragments: 1_056_310_560,
                    fragments_percent: 2,
                },
                max_disk_size: 8_388_608_000,
            }))
        );

        assert_eq!(
            it.next(),
            Some(Usage::Filesystem(Filesystem {
                size: 5_055_008_965_696,
                free: Free {
                    blocks: 2_115_551_961_088,
                    blocks_percent: 42,
                    fragments: 92_600_022_848,
                    fragments_percent: 2,
                },
            }))
        );

        assert_eq!(
            it.next(),
            Some(Usage::Inodes(Inodes {
                used: 100,
                free: 50,
                allocated: 150,
                max: 200,
            }))
        );

        assert_eq!(it.next(), None);
    }

    #[test]
    fn flags_need_exact_literal() {
        let input = "\
mmdf:nsd:HEADER:version:reserved:reserved:nsdName:storagePool:diskSize:failureGroup:metadata:data:freeBlocks:freeBlocksPct:freeFragments:freeFragmentsPct:diskAvailableForAlloc:
mmdf:nsd:0:1:::d1:system:10:1:yes:1:5:50:1:10:up:
";
        let usages = usages(input);

        let [Usage::Nsd(nsd)] = usages.as_slice() else {
            panic!("expected one NSD: {usages:?}");
        };

        assert!(!nsd.holds_metadata());
        assert!(!nsd.holds_objectdata());
    }

    #[test]
    fn event() {
        let mut usages = usages(include_str!("df-example.in")).into_iter();
        let mut nsd = DiskSpace::from(usages.next().unwrap());
        let mut inodes = DiskSpace::from(usages.last().unwrap());

        nsd.tag_device("gpfs1");
        nsd.tag_device("gpfs2");
        inodes.tag_device("gpfs1");

        let nsd = nsd.to_event();
        assert_eq!(nsd["kind"], "nsd");
        assert_eq!(nsd["device"], "gpfs1");
        assert_eq!(nsd["metadata"], false);
        assert_eq!(nsd["free_blocks_percent"], 43);

        let inodes = inodes.to_event();
        assert_eq!(inodes["kind"], "inode");
        assert_eq!(inodes["used_inodes"], 100);
        assert!(!inodes.contains_key("free_blocks"));
    }
}
