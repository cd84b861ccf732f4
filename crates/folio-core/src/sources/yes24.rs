//! Yes24 mobile search, one target per publisher.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{DetailPage, SourceProfile, WarmUp};
use crate::error::AppError;
use crate::extract::{Fallback, FieldRule, ItemSplit, Locator, Post};
use crate::models::{Field, Request, Target};
use crate::results::OutputShape;

pub const SEARCH_BASE: &str = "https://m.yes24.com/search";
pub const ITEM_SELECTOR: &str = ".itemUnit";
pub const NO_IMAGE: &str = "https://image.yes24.com/momo/Noimg_L.jpg";
pub const DEFAULT_ITEM_CAP: usize = 5;

/// Product id from an image URL such as
/// `https://image.yes24.com/goods/146041188/L`.
fn goods_no_from_image(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/goods/")?;
    let id = rest.split('/').next()?;
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit())).then(|| id.to_string())
}

pub fn product_url(goods_no: &str) -> String {
    format!("https://www.yes24.com/product/goods/{goods_no}")
}

fn detail_link(goods_no: &str) -> Option<String> {
    Some(product_url(goods_no))
}

const RULES: &[FieldRule] = &[
    FieldRule {
        field: Field::Title,
        locators: &[Locator::Text(".info_name")],
        post: &[Post::StripTag("[도서]")],
        fallback: Fallback::Empty,
    },
    FieldRule {
        field: Field::Author,
        locators: &[Locator::Text(".info_auth")],
        post: &[],
        fallback: Fallback::Text("저자 정보 없음"),
    },
    FieldRule {
        field: Field::Price,
        locators: &[Locator::Text(".txt_num")],
        post: &[],
        fallback: Fallback::Text("가격 정보 없음"),
    },
    FieldRule {
        field: Field::CoverImage,
        locators: &[
            Locator::Attr("img", "data-original"),
            Locator::Attr("img", "src"),
        ],
        post: &[
            Post::Absolutize("https://m.yes24.com/"),
            Post::Placeholder {
                marker: "Noimg_L.jpg",
                url: NO_IMAGE,
            },
        ],
        fallback: Fallback::WhenPresent {
            selector: "img",
            value: NO_IMAGE,
        },
    },
    FieldRule {
        field: Field::ExternalId,
        locators: &[
            Locator::OwnAttr("data-goods-no"),
            Locator::Derived(Field::CoverImage, goods_no_from_image),
        ],
        post: &[],
        fallback: Fallback::Empty,
    },
    FieldRule {
        field: Field::DetailLink,
        locators: &[Locator::Derived(Field::ExternalId, detail_link)],
        post: &[],
        fallback: Fallback::Empty,
    },
];

const DETAIL_RULES: &[FieldRule] = &[
    FieldRule {
        field: Field::PublishedAt,
        locators: &[
            Locator::Text(".gd_pubArea .gd_date"),
            Locator::Text("#infoset_specific .txt.date"),
            Locator::Text(".gd_date"),
        ],
        post: &[],
        fallback: Fallback::Empty,
    },
    FieldRule {
        field: Field::SaleRank,
        locators: &[
            Locator::Text(".gd_ratingArea .gd_sellNum"),
            Locator::Text(".gd_sellNum"),
        ],
        post: &[Post::DigitsOnly],
        fallback: Fallback::Empty,
    },
];

pub const PROFILE: SourceProfile = SourceProfile {
    name: "yes24",
    split: ItemSplit::Html(ITEM_SELECTOR),
    rules: RULES,
    output: OutputShape::Grouped,
    warm_up: Some(WarmUp {
        url: "https://m.yes24.com",
        settle: Duration::from_secs(5),
    }),
    detail: Some(DetailPage {
        url: product_url,
        ready_selector: "#yDetailTopWrap",
        rules: DETAIL_RULES,
    }),
};

/// A publisher to search for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    pub name: String,
    pub id: String,
}

impl Publisher {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    pub fn search_url(&self) -> String {
        let query: String = url::form_urlencoded::byte_serialize(self.name.as_bytes()).collect();
        format!(
            "{SEARCH_BASE}?query={query}&domain=BOOK&viewMode=&dispNo2=001001003&mkEntrNo={}&order=RECENT",
            self.id
        )
    }

    pub fn target(&self) -> Target {
        Target::new(
            self.name.clone(),
            Request::Rendered {
                url: self.search_url(),
                ready_selector: ITEM_SELECTOR.to_string(),
                scroll: false,
                settle: Duration::ZERO,
            },
        )
    }
}

pub fn default_publishers() -> Vec<Publisher> {
    vec![
        Publisher::new("골든래빗", "287363"),
        Publisher::new("한빛미디어", "1469"),
    ]
}

/// Load a publisher list from a JSON file of `{"name": .., "id": ..}`
/// objects.
pub fn load_publishers(path: &Path) -> Result<Vec<Publisher>, AppError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn targets(publishers: &[Publisher]) -> Vec<Target> {
    publishers.iter().map(Publisher::target).collect()
}
