//! `mm* -Y` output decoding.
//!
//! All `-Y` output shares one convention: every line is split on `:`, column
//! 0 names the producing command, column 1 the record kind and column 2
//! either holds the literal `HEADER` or a per-record version. Header lines
//! announce the column layout of the data lines of their record kind that
//! follow, so no column beyond the first three is ever addressed by position.
//!
//! # Examples
//!
//! ```
//! use mmbeat::parse::{decode, Command};
//! use mmbeat::record::Record;
//!
//! let output = "\
//! mmlsfs::HEADER:version:reserved:reserved:deviceName:fieldName:data:remarks:
//! mmlsfs::0:1:::gpfs1:blockSize:4194304::
//! ";
//!
//! let decoded = decode(Command::LsFs, output);
//!
//! assert!(decoded.failures.is_empty());
//! assert!(matches!(&decoded.records[..], [Record::Device(d)] if d.name() == "gpfs1"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use tracing::{debug, trace};

use crate::error::{DecodeError, RowError};
use crate::record::Record;

/// Column delimiter.
pub const DELIMITER: char = ':';

/// Marker of header lines.
pub const HEADER: &str = "HEADER";

const TAG_COLUMN: usize = 0;
const IDENTIFIER_COLUMN: usize = 1;
const HEADER_COLUMN: usize = 2;

// ----------------------------------------------------------------------------
// tokenizer
// ----------------------------------------------------------------------------

/// Returns the non-empty lines of `output`, each split into its columns.
///
/// The returned iterator is lazy. Clone it to start over.
#[must_use]
pub fn lines(output: &str) -> Lines<'_> {
    Lines {
        inner: output.lines().enumerate(),
    }
}

/// Iterator over tokenized lines, see [`lines`].
#[derive(Clone, Debug)]
pub struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .by_ref()
            .find(|(_, raw)| !raw.is_empty())
            .map(|(i, raw)| Line {
                number: i + 1,
                raw,
                tokens: raw.split(DELIMITER).collect(),
            })
    }
}

/// A tokenized line.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Line<'a> {
    number: usize,
    raw: &'a str,
    tokens: Vec<&'a str>,
}

impl<'a> Line<'a> {
    /// Returns the one-based line number.
    #[must_use]
    pub const fn number(&self) -> usize {
        self.number
    }

    /// Returns the line as it was read.
    #[must_use]
    pub const fn raw(&self) -> &'a str {
        self.raw
    }

    /// Returns the columns.
    #[must_use]
    pub fn tokens(&self) -> &[&'a str] {
        &self.tokens
    }

    /// Returns the tag of the producing command.
    #[must_use]
    pub fn tag(&self) -> &'a str {
        self.column(TAG_COLUMN)
    }

    /// Returns the record-kind identifier.
    #[must_use]
    pub fn identifier(&self) -> &'a str {
        self.column(IDENTIFIER_COLUMN)
    }

    /// Returns `true` if this line announces a column layout.
    ///
    /// The marker is expected in column 2. Some outputs put it into the
    /// identifier column instead, which is accepted as well.
    #[must_use]
    pub fn is_header(&self) -> bool {
        self.column(HEADER_COLUMN) == HEADER
            || self.column(IDENTIFIER_COLUMN) == HEADER
    }

    fn column(&self, i: usize) -> &'a str {
        self.tokens.get(i).copied().unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------
// header registry
// ----------------------------------------------------------------------------

/// Column name to column position, built from a header line.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct HeaderMap<'a>(HashMap<&'a str, usize>);

impl<'a> HeaderMap<'a> {
    /// Builds the map from header tokens. Empty tokens are padding and are
    /// skipped. If a name repeats, the last position wins.
    #[must_use]
    pub fn from_tokens(tokens: &[&'a str]) -> Self {
        let map = tokens
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| (*name, i))
            .collect();

        Self(map)
    }

    /// Returns the position of the named column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<usize> {
        self.0.get(column).copied()
    }

    /// Returns the number of named columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no column is named.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Header maps by record-kind key, scoped to one command invocation.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Registry<'a>(HashMap<&'a str, HeaderMap<'a>>);

impl<'a> Registry<'a> {
    /// Registers the header `tokens` for `key`, replacing any previous map.
    pub fn register(&mut self, key: &'a str, tokens: &[&'a str]) -> &HeaderMap<'a> {
        let header = HeaderMap::from_tokens(tokens);
        debug!(key, columns = header.len(), "registered header");

        self.0.insert(key, header);
        &self.0[key]
    }

    /// Returns the header map of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&HeaderMap<'a>> {
        self.0.get(key)
    }
}

// ----------------------------------------------------------------------------
// typed column access
// ----------------------------------------------------------------------------

/// A data line resolved against its header map.
#[derive(Clone, Copy, Debug)]
pub struct Row<'l, 'a> {
    tokens: &'l [&'a str],
    header: &'l HeaderMap<'a>,
}

impl<'l, 'a> Row<'l, 'a> {
    /// Creates a row from data `tokens` and the `header` of their kind.
    #[must_use]
    pub const fn new(tokens: &'l [&'a str], header: &'l HeaderMap<'a>) -> Self {
        Self { tokens, header }
    }

    /// Returns the raw token of the named column.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::FieldDecode`] if the header does not name the
    /// column or the row is too short.
    pub fn raw(&self, column: &str) -> Result<&'a str, DecodeError> {
        self.header
            .get(column)
            .and_then(|i| self.tokens.get(i).copied())
            .ok_or_else(|| DecodeError::field(column, None))
    }

    /// Returns the named column as an owned string.
    ///
    /// # Errors
    ///
    /// See [`Row::raw`].
    pub fn string(&self, column: &str) -> Result<String, DecodeError> {
        self.raw(column).map(Into::into)
    }

    /// Returns the named column as a base-10 signed 64-bit integer.
    ///
    /// # Errors
    ///
    /// See [`Row::raw`]. Also fails if the value is not an integer.
    pub fn int(&self, column: &str) -> Result<i64, DecodeError> {
        self.parse(column)
    }

    /// Returns `true` if the named column holds exactly `yes`.
    ///
    /// # Errors
    ///
    /// See [`Row::raw`].
    pub fn flag(&self, column: &str, yes: &str) -> Result<bool, DecodeError> {
        self.raw(column).map(|value| value == yes)
    }

    /// Returns the named column as a timestamp, see
    /// [`crate::util::parse_timestamp`].
    ///
    /// # Errors
    ///
    /// See [`Row::raw`]. Also fails if the value does not match the layout.
    pub fn timestamp(&self, column: &str) -> Result<NaiveDateTime, DecodeError> {
        let value = self.raw(column)?;

        crate::util::parse_timestamp(value)
            .map_err(|_| DecodeError::field(column, Some(value)))
    }

    /// Returns the named column parsed with [`FromStr`].
    ///
    /// # Errors
    ///
    /// See [`Row::raw`]. Also fails if parsing fails.
    pub fn parse<T: FromStr>(&self, column: &str) -> Result<T, DecodeError> {
        let value = self.raw(column)?;

        value
            .parse()
            .map_err(|_| DecodeError::field(column, Some(value)))
    }
}

// ----------------------------------------------------------------------------
// dispatch
// ----------------------------------------------------------------------------

/// Decodes one data row into a record.
pub type DecodeFn = fn(&Row<'_, '_>) -> Result<Record, DecodeError>;

/// The supported `-Y` commands.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Command {
    /// `mmrepquota`
    RepQuota,

    /// `mmlsfs`, i.e. device enumeration.
    LsFs,

    /// `mmdf`
    Df,

    /// `mmlsfileset`
    LsFileset,
}

impl Command {
    /// All commands.
    pub const ALL: [Self; 4] =
        [Self::RepQuota, Self::LsFs, Self::Df, Self::LsFileset];

    /// Returns the tag in column 0 of the command's output.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::RepQuota => "mmrepquota",
            Self::LsFs => "mmlsfs",
            Self::Df => "mmdf",
            Self::LsFileset => "mmlsfileset",
        }
    }

    /// Returns the key a line's header map is registered under.
    ///
    /// Only `mmdf` mixes record kinds. The other commands have a single shape
    /// regardless of what they put into the identifier column.
    fn key<'a>(self, line: &Line<'a>) -> &'a str {
        match self {
            Self::Df => line.identifier(),
            Self::RepQuota | Self::LsFs | Self::LsFileset => self.tag(),
        }
    }

    /// Returns the decoder for record kind `identifier`, if it is supported.
    #[must_use]
    pub fn decoder(self, identifier: &str) -> Option<DecodeFn> {
        match (self, identifier) {
            (Self::RepQuota, _) => Some(crate::quota::decode),
            (Self::LsFs, _) => Some(crate::fs::decode),
            (Self::LsFileset, _) => Some(crate::fileset::decode),
            (Self::Df, "nsd") => Some(crate::df::decode_nsd),
            (Self::Df, "poolTotal") => Some(crate::df::decode_pool),
            (Self::Df, "fsTotal") => Some(crate::df::decode_filesystem),
            (Self::Df, "inode") => Some(crate::df::decode_inodes),
            (Self::Df, _) => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quota" | "mmrepquota" => Ok(Self::RepQuota),
            "devices" | "mmlsfs" => Ok(Self::LsFs),
            "df" | "mmdf" => Ok(Self::Df),
            "fileset" | "mmlsfileset" => Ok(Self::LsFileset),
            unknown => Err(UnknownCommand(unknown.into())),
        }
    }
}

/// Error parsing a [`Command`].
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown command: {0}")]
pub struct UnknownCommand(String);

// ----------------------------------------------------------------------------
// decoding
// ----------------------------------------------------------------------------

/// Decoded records and the rows that failed to decode.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Decoded {
    /// Records in source order.
    pub records: Vec<Record>,

    /// Rows that could not be decoded, in source order.
    pub failures: Vec<RowError>,
}

impl Decoded {
    /// Returns `true` if every row was decoded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Extend<Self> for Decoded {
    fn extend<T: IntoIterator<Item = Self>>(&mut self, iter: T) {
        for elem in iter {
            self.records.extend(elem.records);
            self.failures.extend(elem.failures);
        }
    }
}

impl FromIterator<Self> for Decoded {
    fn from_iter<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        let mut c = Self::default();
        c.extend(iter);
        c
    }
}

/// Decodes the `-Y` output of one `command` invocation.
///
/// Lines of other commands are ignored. A row that fails to decode is
/// reported in [`Decoded::failures`] and does not stop decoding the
/// remaining rows.
#[must_use]
pub fn decode(command: Command, output: &str) -> Decoded {
    let mut registry = Registry::default();
    let mut decoded = Decoded::default();

    for line in lines(output) {
        if line.tag() != command.tag() {
            continue;
        }

        if line.is_header() {
            registry.register(command.key(&line), line.tokens());
            continue;
        }

        match decode_line(command, &registry, &line) {
            Ok(Some(record)) => decoded.records.push(record),
            Ok(None) => {
                trace!(
                    identifier = line.identifier(),
                    "skipping unsupported record kind"
                );
            }
            Err(source) => decoded.failures.push(RowError {
                device: None,
                number: line.number(),
                line: line.raw().into(),
                source,
            }),
        }
    }

    decoded
}

fn decode_line(
    command: Command,
    registry: &Registry<'_>,
    line: &Line<'_>,
) -> Result<Option<Record>, DecodeError> {
    let key = command.key(line);

    let header =
        registry
            .get(key)
            .ok_or_else(|| DecodeError::MissingHeader {
                identifier: key.into(),
            })?;

    let Some(decoder) = command.decoder(line.identifier()) else {
        return Ok(None);
    };

    decoder(&Row::new(line.tokens(), header)).map(Some)
}

// ----------------------------------------------------------------------------
// tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_empty_lines() {
        let input = "a:b\n\nc::d\n";

        let tokens = lines(input)
            .map(|line| (line.number(), line.tokens().to_vec()))
            .collect::<Vec<_>>();

        assert_eq!(
            tokens,
            vec![(1, vec!["a", "b"]), (3, vec!["c", "", "d"])]
        );
    }

    #[test]
    fn tokenize_restarts() {
        let lines = lines("x:1\ny:2\n");

        let first = lines.clone().count();
        let second = lines.count();

        assert_eq!((first, second), (2, 2));
    }

    #[test]
    fn header_detection() {
        let mut it = lines(
            "mmdf:nsd:HEADER:version\nmmdf:HEADER:0:1\nmmdf:nsd:0:1\nmmdf",
        );

        assert!(it.next().unwrap().is_header());
        assert!(it.next().unwrap().is_header());
        assert!(!it.next().unwrap().is_header());

        let short = it.next().unwrap();
        assert!(!short.is_header());
        assert_eq!(short.identifier(), "");
    }

    #[test]
    fn header_map_skips_empty_tokens() {
        let header = HeaderMap::from_tokens(&["x", "", "a", "", "b", ""]);

        assert_eq!(header.get("a"), Some(2));
        assert_eq!(header.get("b"), Some(4));
        assert_eq!(header.get(""), None);
        assert_eq!(header.len(), 3);
    }

    #[test]
    fn register_replaces() {
        let mut registry = Registry::default();
        registry.register("k", &["a", "b"]);
        registry.register("k", &["b", "c"]);

        let header = registry.get("k").unwrap();
        assert_eq!(header.get("a"), None);
        assert_eq!(header.get("b"), Some(0));
        assert_eq!(header.get("c"), Some(1));
    }

    #[test]
    fn row_coercion() {
        let header = HeaderMap::from_tokens(&["n", "i", "f", "t"]);
        let tokens = ["x", "-42", "Yes", "Mon Jan 2 15%3A04%3A05 2006"];
        let row = Row::new(&tokens, &header);

        assert_eq!(row.string("n").unwrap(), "x");
        assert_eq!(row.int("i").unwrap(), -42);
        assert!(row.flag("f", "Yes").unwrap());
        assert!(!row.flag("f", "yes").unwrap());
        assert!(row.timestamp("t").is_ok());
    }

    #[test]
    fn row_errors() {
        let header = HeaderMap::from_tokens(&["n", "i", "late"]);
        let tokens = ["x", "4.2"];
        let row = Row::new(&tokens, &header);

        assert_eq!(
            row.int("i"),
            Err(DecodeError::FieldDecode {
                column: "i".into(),
                value: Some("4.2".into()),
            })
        );

        assert_eq!(
            row.raw("late"),
            Err(DecodeError::FieldDecode {
                column: "late".into(),
                value: None,
            })
        );

        assert_eq!(
            row.string("missing"),
            Err(DecodeError::FieldDecode {
                column: "missing".into(),
                value: None,
            })
        );

        assert!(row.timestamp("n").is_err());
    }

    #[test]
    fn data_before_header() {
        let input = "\
mmdf:nsd:0:1:::disk1:system:
mmdf:nsd:HEADER:version:reserved:reserved:nsdName:storagePool:
";
        let decoded = decode(Command::Df, input);

        assert!(decoded.records.is_empty());
        assert_eq!(
            decoded.failures,
            vec![RowError {
                device: None,
                number: 1,
                line: "mmdf:nsd:0:1:::disk1:system:".into(),
                source: DecodeError::MissingHeader {
                    identifier: "nsd".into()
                },
            }]
        );
    }

    #[test]
    fn foreign_lines_are_ignored() {
        let input = "\
*** Report for USR GRP FILESET quotas on gpfs1
mmlsfs::HEADER:version:reserved:reserved:deviceName:fieldName:data:remarks:
mmlsfs::0:1:::gpfs1:blockSize:4194304::
";
        let decoded = decode(Command::RepQuota, input);

        assert_eq!(decoded, Decoded::default());
    }

    #[test]
    fn unsupported_identifier_is_skipped() {
        let input = "\
mmdf:future:HEADER:version:reserved:reserved:thing:
mmdf:future:0:1:::42:
";
        let decoded = decode(Command::Df, input);

        assert_eq!(decoded, Decoded::default());
    }

    #[test]
    fn command_names() {
        for command in Command::ALL {
            assert_eq!(command.tag().parse::<Command>(), Ok(command));
        }

        assert_eq!("df".parse::<Command>(), Ok(Command::Df));
        assert!("mmlsdisk".parse::<Command>().is_err());
    }
}
