//! Per-site extraction profiles.
//!
//! A [`SourceProfile`] is pure data: how to split fetched content into
//! items, the field rules for each item, the output layout, and the
//! optional warm-up and detail-page steps. The harvester treats every
//! source the same way.

use std::time::Duration;

use crate::extract::{FieldRule, ItemSplit};
use crate::models::Request;
use crate::results::OutputShape;

pub mod manning;
pub mod oreilly;
pub mod yes24;

#[derive(Debug, Clone, Copy)]
pub struct SourceProfile {
    pub name: &'static str,
    pub split: ItemSplit,
    pub rules: &'static [FieldRule],
    pub output: OutputShape,
    /// Page visited once after the session opens, before any target.
    pub warm_up: Option<WarmUp>,
    /// Secondary per-item page, fetched only when enabled in the config.
    pub detail: Option<DetailPage>,
}

#[derive(Debug, Clone, Copy)]
pub struct WarmUp {
    pub url: &'static str,
    pub settle: Duration,
}

impl WarmUp {
    pub fn request(&self) -> Request {
        Request::Rendered {
            url: self.url.to_string(),
            ready_selector: "body".to_string(),
            scroll: false,
            settle: self.settle,
        }
    }
}

/// A per-book page keyed by the item's external identifier.
#[derive(Debug, Clone, Copy)]
pub struct DetailPage {
    pub url: fn(&str) -> String,
    pub ready_selector: &'static str,
    pub rules: &'static [FieldRule],
}

impl DetailPage {
    pub fn request(&self, external_id: &str) -> Request {
        Request::Rendered {
            url: (self.url)(external_id),
            ready_selector: self.ready_selector.to_string(),
            scroll: false,
            settle: Duration::ZERO,
        }
    }
}
