//! Manning catalog search API.

use serde::{Deserialize, Serialize};

use super::SourceProfile;
use crate::error::AppError;
use crate::extract::{Fallback, FieldRule, ItemSplit, Locator, Post};
use crate::models::{Field, Request, Target};
use crate::results::OutputShape;

pub const API_URL: &str = "https://www.manning.com/search/getCatalogData";
pub const COVER_BASE: &str = "https://images.manning.com/320/400/resize/";

const RULES: &[FieldRule] = &[
    FieldRule {
        field: Field::Title,
        locators: &[Locator::Key("title"), Locator::Key("name")],
        post: &[],
        fallback: Fallback::Empty,
    },
    FieldRule {
        field: Field::DetailLink,
        locators: &[Locator::Key("link")],
        post: &[],
        fallback: Fallback::Empty,
    },
    FieldRule {
        field: Field::CoverImage,
        locators: &[Locator::Key("imageUrl")],
        post: &[Post::Prefix(COVER_BASE)],
        fallback: Fallback::Empty,
    },
];

pub const PROFILE: SourceProfile = SourceProfile {
    name: "manning",
    split: ItemSplit::JsonCatalog,
    rules: RULES,
    output: OutputShape::Flat,
    warm_up: None,
    detail: None,
};

/// Search payload posted to [`API_URL`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuery {
    pub access_type: Vec<String>,
    pub keywords: Vec<String>,
    pub level: Vec<String>,
    pub meap_filter: String,
    pub product_type: Vec<String>,
    pub programming_languages: Vec<String>,
    pub selected_category_ids: Vec<u32>,
    pub sort: String,
    pub include_prices: bool,
    pub page: u32,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            access_type: Vec::new(),
            keywords: Vec::new(),
            level: Vec::new(),
            meap_filter: "meap".to_string(),
            product_type: vec!["book".to_string()],
            programming_languages: Vec::new(),
            selected_category_ids: vec![1],
            sort: "newest".to_string(),
            include_prices: true,
            page: 1,
        }
    }
}

impl CatalogQuery {
    pub fn target(&self) -> Result<Target, AppError> {
        Ok(Target::new(
            PROFILE.name,
            Request::Json {
                url: API_URL.to_string(),
                payload: serde_json::to_value(self)?,
            },
        ))
    }
}
