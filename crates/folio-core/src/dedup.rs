//! Keyed deduplication of records.
//!
//! Records are keyed by [`Record::dedup_key`]. When a key is seen again the
//! candidate replaces the incumbent only if its
//! [`completeness_score`](Record::completeness_score) is strictly greater,
//! so equal scores keep whichever record arrived first in this run. The
//! outcome therefore depends on fetch order when scores tie.

use std::collections::HashMap;

use crate::models::Record;

/// What [`DedupTable::fold`] did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    Inserted,
    Replaced,
    Kept,
}

/// Best record per dedup key, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct DedupTable {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl DedupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `record` into the table.
    ///
    /// A replacement takes over the incumbent's position.
    pub fn fold(&mut self, record: Record) -> FoldOutcome {
        match self.index.get(record.dedup_key()).copied() {
            Some(slot) => {
                let incumbent = &mut self.records[slot];
                if record.completeness_score() > incumbent.completeness_score() {
                    *incumbent = record;
                    FoldOutcome::Replaced
                } else {
                    FoldOutcome::Kept
                }
            }
            None => {
                self.index
                    .insert(record.dedup_key().to_string(), self.records.len());
                self.records.push(record);
                FoldOutcome::Inserted
            }
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
