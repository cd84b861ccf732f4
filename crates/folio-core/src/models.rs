use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a target's content is obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// POST a JSON payload to a catalog API.
    Json {
        url: String,
        payload: serde_json::Value,
    },
    /// Navigate a browser to `url` and snapshot the markup once
    /// `ready_selector` is present.
    Rendered {
        url: String,
        ready_selector: String,
        /// Scroll to the bottom before snapshotting to trigger lazy loading.
        scroll: bool,
        /// Settle time after the page is ready (and scrolled).
        settle: Duration,
    },
}

impl Request {
    pub fn url(&self) -> &str {
        match self {
            Request::Json { url, .. } | Request::Rendered { url, .. } => url,
        }
    }
}

/// One unit of harvesting work: a labelled request.
///
/// The label is the search query, publisher name, or listing name the
/// records are grouped under.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub label: String,
    pub request: Request,
}

impl Target {
    pub fn new(label: impl Into<String>, request: Request) -> Self {
        Self {
            label: label.into(),
            request,
        }
    }
}

/// Content returned by a fetcher.
#[derive(Debug, Clone, PartialEq)]
pub enum RawContent {
    Json(serde_json::Value),
    Html(String),
}

/// Semantic fields a source can extract for a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Author,
    Price,
    CoverImage,
    DetailLink,
    Description,
    PublishedAt,
    ExternalId,
    SaleRank,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Author => "author",
            Field::Price => "price",
            Field::CoverImage => "cover_image",
            Field::DetailLink => "detail_link",
            Field::Description => "description",
            Field::PublishedAt => "published_at",
            Field::ExternalId => "external_id",
            Field::SaleRank => "sale_rank",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw field values pulled out of one item.
///
/// `None` means the source does not declare the field at all. A declared
/// field that could not be resolved holds its sentinel (empty string or a
/// placeholder), never `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<String>,
    pub cover_image: Option<String>,
    pub detail_link: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<String>,
    pub external_id: Option<String>,
    pub sale_rank: Option<String>,
}

impl ExtractedFields {
    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Title => &self.title,
            Field::Author => &self.author,
            Field::Price => &self.price,
            Field::CoverImage => &self.cover_image,
            Field::DetailLink => &self.detail_link,
            Field::Description => &self.description,
            Field::PublishedAt => &self.published_at,
            Field::ExternalId => &self.external_id,
            Field::SaleRank => &self.sale_rank,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Author => &mut self.author,
            Field::Price => &mut self.price,
            Field::CoverImage => &mut self.cover_image,
            Field::DetailLink => &mut self.detail_link,
            Field::Description => &mut self.description,
            Field::PublishedAt => &mut self.published_at,
            Field::ExternalId => &mut self.external_id,
            Field::SaleRank => &mut self.sale_rank,
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    /// Declare `field` with an empty sentinel unless it already has a value.
    pub fn declare(&mut self, field: Field) {
        self.slot_mut(field).get_or_insert_with(String::new);
    }

    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Copy every non-empty value of `other` over this one.
    pub fn absorb(&mut self, other: ExtractedFields) {
        for (field, value) in other.into_pairs() {
            if !value.is_empty() {
                self.set(field, value);
            }
        }
    }

    fn into_pairs(self) -> impl Iterator<Item = (Field, String)> {
        [
            (Field::Title, self.title),
            (Field::Author, self.author),
            (Field::Price, self.price),
            (Field::CoverImage, self.cover_image),
            (Field::DetailLink, self.detail_link),
            (Field::Description, self.description),
            (Field::PublishedAt, self.published_at),
            (Field::ExternalId, self.external_id),
            (Field::SaleRank, self.sale_rank),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
    }
}

/// A normalized book record as written to the output file.
///
/// Optional fields the source does not declare are omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_link: Option<String>,
    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_rank: Option<String>,
}

impl Record {
    /// Detail link when present, otherwise the title.
    pub fn dedup_key(&self) -> &str {
        match self.detail_link.as_deref() {
            Some(link) if !link.is_empty() => link,
            _ => &self.title,
        }
    }

    /// Number of non-empty fields among description, published date, and
    /// cover image.
    pub fn completeness_score(&self) -> usize {
        [&self.description, &self.published_at, &self.cover_image]
            .into_iter()
            .filter(|field| field.as_deref().is_some_and(|v| !v.is_empty()))
            .count()
    }
}

impl From<Record> for ExtractedFields {
    fn from(record: Record) -> Self {
        Self {
            title: Some(record.title),
            author: record.author,
            price: record.price,
            cover_image: record.cover_image,
            detail_link: record.detail_link,
            description: record.description,
            published_at: record.published_at,
            external_id: record.external_id,
            sale_rank: record.sale_rank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> Record {
        Record {
            title: title.to_string(),
            author: None,
            price: None,
            description: None,
            published_at: None,
            detail_link: None,
            cover_image: None,
            external_id: None,
            sale_rank: None,
        }
    }

    #[test]
    fn test_dedup_key_prefers_detail_link() {
        let mut r = record("Rust in Action");
        assert_eq!(r.dedup_key(), "Rust in Action");

        r.detail_link = Some(String::new());
        assert_eq!(r.dedup_key(), "Rust in Action");

        r.detail_link = Some("https://example.com/rust".into());
        assert_eq!(r.dedup_key(), "https://example.com/rust");
    }

    #[test]
    fn test_completeness_score_counts_non_empty() {
        let mut r = record("Rust");
        assert_eq!(r.completeness_score(), 0);

        r.description = Some(String::new());
        r.published_at = Some("March 2024".into());
        r.cover_image = Some("https://img/x.jpg".into());
        // author is not part of the score
        r.author = Some("Someone".into());
        assert_eq!(r.completeness_score(), 2);
    }

    #[test]
    fn test_record_serialization_omits_undeclared_fields() {
        let mut r = record("Foo");
        r.detail_link = Some("/p/1".into());
        r.cover_image = Some(String::new());

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"title": "Foo", "detail_link": "/p/1", "cover_image": ""})
        );
    }

    #[test]
    fn test_record_accepts_image_url_alias() {
        let r: Record =
            serde_json::from_str(r#"{"title": "Foo", "image_url": "https://img/a.jpg"}"#).unwrap();
        assert_eq!(r.cover_image.as_deref(), Some("https://img/a.jpg"));
    }

    #[test]
    fn test_extracted_fields_absorb_keeps_existing_on_empty() {
        let mut base = ExtractedFields::default();
        base.set(Field::Title, "Foo");
        base.set(Field::PublishedAt, "");

        let mut detail = ExtractedFields::default();
        detail.set(Field::PublishedAt, "2024-03-01");
        detail.set(Field::SaleRank, "");
        detail.set(Field::Title, "");

        base.absorb(detail);
        assert_eq!(base.get(Field::Title), Some("Foo"));
        assert_eq!(base.get(Field::PublishedAt), Some("2024-03-01"));
        assert_eq!(base.get(Field::SaleRank), None);
    }

    #[test]
    fn test_declare_does_not_overwrite() {
        let mut fields = ExtractedFields::default();
        fields.set(Field::SaleRank, "1234");
        fields.declare(Field::SaleRank);
        fields.declare(Field::PublishedAt);
        assert_eq!(fields.get(Field::SaleRank), Some("1234"));
        assert_eq!(fields.get(Field::PublishedAt), Some(""));
    }

    #[test]
    fn test_request_url() {
        let req = Request::Json {
            url: "https://api.example.com".into(),
            payload: serde_json::json!({}),
        };
        assert_eq!(req.url(), "https://api.example.com");
    }
}
