use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use csv::{ByteRecord, ReaderBuilder};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use strum::IntoEnumIterator;
use tracing::{debug, info, trace, warn};
use ustr::{Ustr, UstrMap};

use crate::error::NormalizeError;
use crate::location::canonical_location;
use crate::record::{RawRecord, SkipReason};
use crate::title::TitleParser;
use crate::{FIELD_DELIMITER, HEADER_SENTINEL, MIN_LOCATION_SEGMENTS};

pub type Titles = SmallVec<[Ustr; 1]>;

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub header_sentinel: String,
    pub delimiter: u8,
    pub min_segments: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            header_sentinel: HEADER_SENTINEL.to_string(),
            delimiter: FIELD_DELIMITER,
            min_segments: MIN_LOCATION_SEGMENTS,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizeStats {
    pub accepted: usize,
    skipped: [usize; 4],
}

impl NormalizeStats {
    fn skip(&mut self, reason: SkipReason) {
        self.skipped[reason as usize] += 1;
    }
    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.skipped[reason as usize]
    }
    pub fn total_skipped(&self) -> usize {
        self.skipped.iter().sum()
    }
}

/// Canonical location -> film titles, both in file order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LocationTitles {
    entries: Vec<(Ustr, Titles)>,
    index: UstrMap<usize>,
}

impl LocationTitles {
    pub(crate) fn insert(&mut self, key: &str, title: Ustr) {
        let key = Ustr::from(key);
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1.push(title),
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((key, smallvec::smallvec![title]));
            }
        }
    }
    pub fn get(&self, key: &str) -> Option<&[Ustr]> {
        let key = Ustr::from_existing(key)?;
        self.index.get(&key).map(|&i| self.entries[i].1.as_slice())
    }
    pub fn keys(&self) -> impl Iterator<Item = Ustr> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }
    pub fn iter(&self) -> impl Iterator<Item = (Ustr, &[Ustr])> + '_ {
        self.entries.iter().map(|(key, titles)| (*key, titles.as_slice()))
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_bytes(
        bytes: &[u8],
        config: &NormalizerConfig,
        parser: &impl TitleParser,
    ) -> (Self, NormalizeStats) {
        let mut db = LocationTitles::default();
        let mut stats = NormalizeStats::default();
        let body = skip_header(bytes, &config.header_sentinel);
        let mut reader = ReaderBuilder::new()
            .delimiter(config.delimiter)
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(body);
        let mut fields = ByteRecord::new();
        loop {
            match reader.read_byte_record(&mut fields) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    warn!("Stopped reading dataset: {}", err);
                    break;
                }
            }
            match db.add_record(&fields, config, parser) {
                Ok(()) => stats.accepted += 1,
                Err(reason) => {
                    trace!("Skipping line {:?}: {}", fields.position(), reason);
                    stats.skip(reason);
                }
            }
        }
        (db, stats)
    }

    pub fn from_reader(
        mut reader: impl Read,
        config: &NormalizerConfig,
        parser: &impl TitleParser,
    ) -> Result<(Self, NormalizeStats), NormalizeError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::from_bytes(&bytes, config, parser))
    }

    fn add_record(
        &mut self,
        fields: &ByteRecord,
        config: &NormalizerConfig,
        parser: &impl TitleParser,
    ) -> Result<(), SkipReason> {
        let record = RawRecord::from_fields(fields)?;
        let title = parser
            .parse_title(record.title)
            .ok_or(SkipReason::EmptyTitle)?;
        let key = canonical_location(&record.location, config.min_segments)
            .ok_or(SkipReason::TooGeneric)?;
        self.insert(&key, Ustr::from(&title));
        Ok(())
    }
}

impl<'a> FromIterator<(&'a str, Ustr)> for LocationTitles {
    /// Builds a mapping from already canonical keys, in iteration order.
    fn from_iter<I: IntoIterator<Item = (&'a str, Ustr)>>(iter: I) -> Self {
        let mut db = LocationTitles::default();
        for (key, title) in iter {
            db.insert(key, title);
        }
        db
    }
}

impl Serialize for LocationTitles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, titles) in &self.entries {
            map.serialize_entry(key.as_str(), titles)?;
        }
        map.end()
    }
}

/// Returns what follows the sentinel line, or the whole input when there is none.
fn skip_header<'b>(bytes: &'b [u8], sentinel: &str) -> &'b [u8] {
    let mut offset = 0;
    for line in bytes.split_inclusive(|b| *b == b'\n') {
        offset += line.len();
        if trim_line_end(line) == sentinel.as_bytes() {
            return &bytes[offset..];
        }
    }
    debug!("No header sentinel found, reading everything as data");
    bytes
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

pub fn parse_dataset_file(
    path: impl AsRef<Path>,
    config: &NormalizerConfig,
    parser: &impl TitleParser,
) -> Result<(LocationTitles, NormalizeStats), NormalizeError> {
    let path = path.as_ref();
    let start = Instant::now();
    info!("Reading {:?}...", path);
    let bytes = fs::read(path).map_err(|source| NormalizeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (db, stats) = LocationTitles::from_bytes(&bytes, config, parser);
    info!(
        "{} locations from {} records in {:.2?}",
        db.len(),
        stats.accepted,
        start.elapsed()
    );
    for reason in SkipReason::iter() {
        debug!("Skipped ({}): {}", reason, stats.skipped(reason));
    }
    Ok((db, stats))
}
