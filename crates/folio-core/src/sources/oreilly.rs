//! O'Reilly search results page (client-rendered).

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::SourceProfile;
use crate::extract::{Fallback, FieldRule, ItemSplit, Locator, Post};
use crate::models::{Field, Request, Target};
use crate::results::OutputShape;

pub const SEARCH_URL: &str = "https://www.oreilly.com/search/?q=*&type=book&publishers=O%27Reilly%20Media%2C%20Inc.&rows=100&order_by=published_at";
pub const CARD_SELECTOR: &str = r#"[data-testid^="search-card"]"#;

const PUBLISHED_LABEL: &str = "출판일";

static PUBLISHED_AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)\s+(?:\d{1,2},\s*)?\d{4}",
    )
    .expect("published date pattern is valid")
});

fn strip_label(text: &str) -> String {
    Post::StripLabel(PUBLISHED_LABEL).apply(text)
}

/// A footer line that reads like a publication date.
fn footer_date(text: &str) -> Option<String> {
    let value = strip_label(text);
    if value.to_lowercase().contains("page") {
        return None;
    }
    PUBLISHED_AT.is_match(&value).then_some(value)
}

/// A footer line explicitly labelled as the publication date.
fn footer_labelled(text: &str) -> Option<String> {
    let value = strip_label(text);
    if !text.contains(PUBLISHED_LABEL) || value.to_lowercase().contains("page") {
        return None;
    }
    Some(value)
}

const FOOTER: &str = ".MuiTypography-cardFooter";

const RULES: &[FieldRule] = &[
    FieldRule {
        field: Field::Title,
        locators: &[Locator::Text("h4.title"), Locator::Text("a.MuiTypography-link")],
        post: &[],
        fallback: Fallback::Empty,
    },
    FieldRule {
        field: Field::Description,
        locators: &[Locator::Text(r#"[data-testid^="search-card-description"]"#)],
        post: &[],
        fallback: Fallback::Empty,
    },
    FieldRule {
        field: Field::PublishedAt,
        locators: &[
            Locator::TextWhere(FOOTER, footer_date),
            Locator::TextWhere(FOOTER, footer_labelled),
            Locator::Text(r#"[data-testid*="published"]"#),
        ],
        post: &[Post::StripLabel(PUBLISHED_LABEL)],
        fallback: Fallback::Empty,
    },
    FieldRule {
        field: Field::DetailLink,
        locators: &[Locator::Attr("a.MuiTypography-link", "href")],
        post: &[Post::Absolutize(SEARCH_URL)],
        fallback: Fallback::Empty,
    },
    FieldRule {
        field: Field::CoverImage,
        locators: &[
            Locator::Attr(r#"img[src*="/covers/"]"#, "src"),
            Locator::Attr(r#"img[data-src*="/covers/"]"#, "data-src"),
        ],
        post: &[Post::Absolutize(SEARCH_URL)],
        fallback: Fallback::Empty,
    },
];

pub const PROFILE: SourceProfile = SourceProfile {
    name: "oreilly",
    split: ItemSplit::Html(CARD_SELECTOR),
    rules: RULES,
    output: OutputShape::Flat,
    warm_up: None,
    detail: None,
};

/// The single listing page, scrolled to the bottom and given 2 s to load
/// lazy content.
pub fn target() -> Target {
    Target::new(
        PROFILE.name,
        Request::Rendered {
            url: SEARCH_URL.to_string(),
            ready_selector: CARD_SELECTOR.to_string(),
            scroll: true,
            settle: Duration::from_secs(2),
        },
    )
}
