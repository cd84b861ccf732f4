use std::path::Path;

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::dedup::{DedupTable, FoldOutcome};
use crate::error::AppError;
use crate::models::Record;

/// How a result set is laid out in the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// One array with the records of every source, in target order.
    Flat,
    /// An object mapping each source label to its records, in target order.
    Grouped,
}

/// Records accumulated over a run, grouped by target label.
///
/// Groups keep the order in which they were opened, and each group is its
/// own [`DedupTable`].
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    groups: Vec<(String, DedupTable)>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a group exists for `source`, creating an empty one at the
    /// end if needed.
    pub fn open(&mut self, source: &str) -> &mut DedupTable {
        let position = match self.groups.iter().position(|(name, _)| name == source) {
            Some(position) => position,
            None => {
                self.groups.push((source.to_string(), DedupTable::new()));
                self.groups.len() - 1
            }
        };
        &mut self.groups[position].1
    }

    pub fn fold(&mut self, source: &str, record: Record) -> FoldOutcome {
        self.open(source).fold(record)
    }

    pub fn group(&self, source: &str) -> Option<&[Record]> {
        self.groups
            .iter()
            .find(|(name, _)| name == source)
            .map(|(_, table)| table.records())
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &[Record])> {
        self.groups
            .iter()
            .map(|(name, table)| (name.as_str(), table.records()))
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.groups.iter().flat_map(|(_, table)| table.records())
    }

    /// Total number of records across all groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, table)| table.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render as pretty-printed JSON. Non-ASCII text is written verbatim.
    pub fn to_json(&self, shape: OutputShape) -> Result<String, AppError> {
        let json = match shape {
            OutputShape::Flat => serde_json::to_string_pretty(&self.records().collect::<Vec<_>>())?,
            OutputShape::Grouped => serde_json::to_string_pretty(&Grouped(self))?,
        };
        Ok(json)
    }

    /// Write the JSON rendering to `path` (UTF-8, trailing newline).
    pub fn write_json(&self, path: &Path, shape: OutputShape) -> Result<(), AppError> {
        let mut json = self.to_json(shape)?;
        json.push('\n');
        std::fs::write(path, json)?;
        tracing::info!(records = self.len(), path = %path.display(), "Saved records");
        Ok(())
    }
}

/// Serializes groups as a map without reordering keys.
struct Grouped<'a>(&'a ResultSet);

impl Serialize for Grouped<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.groups.len()))?;
        for (name, records) in self.0.groups() {
            map.serialize_entry(name, records)?;
        }
        map.end()
    }
}
