//! Declarative field extraction.
//!
//! A source describes each field it wants as a [`FieldRule`]: an ordered
//! list of [`Locator`]s, post-processing steps, and a fallback. Rules are
//! evaluated top to bottom; for each rule the first locator whose
//! post-processed value is non-empty wins, otherwise the fallback is used.
//! Later rules can read earlier results through [`Locator::Derived`].
//!
//! ```text
//! RawContent ──split──▶ RawItem* ──rules──▶ ExtractedFields (title required)
//! ```

use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::models::{ExtractedFields, Field, RawContent};
use crate::normalize::{absolutize, collapse_whitespace, digits_only};

/// Keys probed, in order, for the item list of a catalog API response.
pub const CATALOG_KEYS: [&str; 6] = ["items", "results", "products", "data", "payload", "catalog"];

/// Where to read one candidate value from.
#[derive(Debug, Clone, Copy)]
pub enum Locator {
    /// Text of the first element matching the selector inside the item.
    Text(&'static str),
    /// Attribute of the first element matching the selector inside the item.
    Attr(&'static str, &'static str),
    /// Attribute on the item element itself.
    OwnAttr(&'static str),
    /// String or number under a key of a JSON item.
    Key(&'static str),
    /// First element matching the selector whose (collapsed) text the
    /// function accepts; the function's output is the value.
    TextWhere(&'static str, fn(&str) -> Option<String>),
    /// Computed from a field resolved by an earlier rule.
    Derived(Field, fn(&str) -> Option<String>),
}

/// Post-processing applied to a located value.
#[derive(Debug, Clone, Copy)]
pub enum Post {
    /// Remove every occurrence of a tag such as `[도서]`.
    StripTag(&'static str),
    /// Drop everything up to the first `:` when the value carries `label`.
    StripLabel(&'static str),
    /// Resolve against a base URL.
    Absolutize(&'static str),
    /// Prefix a bare path with a base (leading slashes removed). Absolute
    /// URLs pass through.
    Prefix(&'static str),
    /// Replace a URL containing `marker` with the canonical placeholder.
    Placeholder {
        marker: &'static str,
        url: &'static str,
    },
    /// Keep only digits.
    DigitsOnly,
}

impl Post {
    pub fn apply(&self, value: &str) -> String {
        match self {
            Post::StripTag(tag) => value.replace(tag, "").trim().to_string(),
            Post::StripLabel(label) => {
                if value.contains(label) {
                    value
                        .split_once(':')
                        .map(|(_, rest)| rest.trim().to_string())
                        .unwrap_or_else(|| value.replace(label, "").trim().to_string())
                } else {
                    value.to_string()
                }
            }
            Post::Absolutize(base) => absolutize(value, base),
            Post::Prefix(base) => {
                if value.is_empty() || value.starts_with("http://") || value.starts_with("https://")
                {
                    value.to_string()
                } else {
                    format!("{base}{}", value.trim_start_matches('/'))
                }
            }
            Post::Placeholder { marker, url } => {
                if value.contains(marker) {
                    url.to_string()
                } else {
                    value.to_string()
                }
            }
            Post::DigitsOnly => digits_only(value),
        }
    }
}

/// Value used when no locator produced anything.
#[derive(Debug, Clone, Copy)]
pub enum Fallback {
    Empty,
    /// A display placeholder such as `가격 정보 없음`.
    Text(&'static str),
    /// `value` when the item contains an element matching `selector`,
    /// empty otherwise.
    WhenPresent {
        selector: &'static str,
        value: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: Field,
    pub locators: &'static [Locator],
    pub post: &'static [Post],
    pub fallback: Fallback,
}

/// How fetched content is split into items.
#[derive(Debug, Clone, Copy)]
pub enum ItemSplit {
    /// JSON catalog response; see [`catalog_items`].
    JsonCatalog,
    /// Every element matching the selector is one item.
    Html(&'static str),
}

/// One candidate book entry.
#[derive(Debug, Clone, Copy)]
pub enum RawItem<'a> {
    Json(&'a Map<String, Value>),
    Html(ElementRef<'a>),
}

/// Items extracted from one page.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Items with a resolvable title, in page order.
    pub items: Vec<ExtractedFields>,
    /// Items dropped because no title could be resolved.
    pub untitled: usize,
    /// Items dropped because extraction failed.
    pub skipped: usize,
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::ExtractionError(format!("invalid selector `{css}`: {e}")))
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn json_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Locator {
    fn locate(
        &self,
        item: RawItem<'_>,
        resolved: &ExtractedFields,
    ) -> Result<Option<String>, AppError> {
        match (self, item) {
            (Locator::Derived(field, derive), _) => Ok(resolved
                .get(*field)
                .filter(|v| !v.is_empty())
                .and_then(|v| derive(v))),
            (Locator::Key(key), RawItem::Json(obj)) => Ok(obj.get(*key).and_then(json_string)),
            (Locator::Text(css), RawItem::Html(el)) => {
                Ok(el.select(&selector(css)?).next().map(element_text))
            }
            (Locator::Attr(css, attr), RawItem::Html(el)) => Ok(el
                .select(&selector(css)?)
                .next()
                .and_then(|found| found.value().attr(attr))
                .map(str::to_string)),
            (Locator::OwnAttr(attr), RawItem::Html(el)) => {
                Ok(el.value().attr(attr).map(str::to_string))
            }
            (Locator::TextWhere(css, accept), RawItem::Html(el)) => Ok(el
                .select(&selector(css)?)
                .map(element_text)
                .find_map(|text| accept(&text))),
            (locator, RawItem::Json(_)) => Err(AppError::ExtractionError(format!(
                "{locator:?} cannot read a JSON item"
            ))),
            (locator, RawItem::Html(_)) => Err(AppError::ExtractionError(format!(
                "{locator:?} cannot read an HTML item"
            ))),
        }
    }
}

impl Fallback {
    fn resolve(&self, item: RawItem<'_>) -> Result<String, AppError> {
        match (self, item) {
            (Fallback::Empty, _) => Ok(String::new()),
            (Fallback::Text(text), _) => Ok(text.to_string()),
            (Fallback::WhenPresent { selector: css, value }, RawItem::Html(el)) => {
                if el.select(&selector(css)?).next().is_some() {
                    Ok(value.to_string())
                } else {
                    Ok(String::new())
                }
            }
            (Fallback::WhenPresent { .. }, RawItem::Json(_)) => Ok(String::new()),
        }
    }
}

impl FieldRule {
    fn resolve(&self, item: RawItem<'_>, resolved: &ExtractedFields) -> Result<String, AppError> {
        for locator in self.locators {
            let Some(raw) = locator.locate(item, resolved)? else {
                continue;
            };
            let value = self
                .post
                .iter()
                .fold(raw.trim().to_string(), |value, post| post.apply(&value));
            if !value.is_empty() {
                return Ok(value);
            }
        }
        self.fallback.resolve(item)
    }
}

/// Run `rules` against one item. Every rule's field ends up declared.
pub fn extract_fields(
    rules: &[FieldRule],
    item: RawItem<'_>,
) -> Result<ExtractedFields, AppError> {
    let mut fields = ExtractedFields::default();
    for rule in rules {
        let value = rule.resolve(item, &fields)?;
        fields.set(rule.field, value);
    }
    Ok(fields)
}

/// Find the list of item objects in a catalog API response.
///
/// A top-level array is used directly. For an object, [`CATALOG_KEYS`] are
/// probed in order; an array value is taken as the item list, an object
/// value is searched one level deeper. Non-object elements are dropped.
pub fn catalog_items(data: &Value) -> Vec<&Map<String, Value>> {
    catalog_items_at(data, 1)
}

fn catalog_items_at(data: &Value, depth: usize) -> Vec<&Map<String, Value>> {
    match data {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(map) => {
            for key in CATALOG_KEYS {
                match map.get(key) {
                    Some(Value::Array(items)) => {
                        return items.iter().filter_map(Value::as_object).collect();
                    }
                    Some(nested @ Value::Object(_)) if depth > 0 => {
                        let found = catalog_items_at(nested, depth - 1);
                        if !found.is_empty() {
                            return found;
                        }
                    }
                    _ => {}
                }
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn collect<'a>(
    candidates: impl Iterator<Item = RawItem<'a>>,
    rules: &[FieldRule],
    cap: Option<usize>,
) -> Extraction {
    let mut extraction = Extraction::default();
    for (index, item) in candidates.take(cap.unwrap_or(usize::MAX)).enumerate() {
        match extract_fields(rules, item) {
            Ok(fields) if fields.has_title() => extraction.items.push(fields),
            Ok(_) => extraction.untitled += 1,
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping item");
                extraction.skipped += 1;
            }
        }
    }
    extraction
}

/// Split `content` into items and extract each one.
///
/// `cap` limits how many candidate items are looked at (before the title
/// check). Items without a title are dropped here, and an item whose
/// extraction fails is skipped without affecting its siblings.
pub fn extract_items(
    split: ItemSplit,
    rules: &[FieldRule],
    content: &RawContent,
    cap: Option<usize>,
) -> Result<Extraction, AppError> {
    match (split, content) {
        (ItemSplit::JsonCatalog, RawContent::Json(data)) => {
            let items = catalog_items(data);
            if items.is_empty() {
                tracing::warn!("No catalog items found in response");
            }
            Ok(collect(items.into_iter().map(RawItem::Json), rules, cap))
        }
        (ItemSplit::Html(css), RawContent::Html(html)) => {
            let document = Html::parse_document(html);
            let item_selector = selector(css)?;
            Ok(collect(
                document.select(&item_selector).map(RawItem::Html),
                rules,
                cap,
            ))
        }
        (ItemSplit::JsonCatalog, RawContent::Html(_)) => Err(AppError::ExtractionError(
            "expected a JSON catalog response, got HTML".into(),
        )),
        (ItemSplit::Html(_), RawContent::Json(_)) => Err(AppError::ExtractionError(
            "expected an HTML page, got JSON".into(),
        )),
    }
}

/// Extract fields from a whole page (used for per-book detail pages).
pub fn extract_page(rules: &[FieldRule], content: &RawContent) -> Result<ExtractedFields, AppError> {
    match content {
        RawContent::Html(html) => {
            let document = Html::parse_document(html);
            extract_fields(rules, RawItem::Html(document.root_element()))
        }
        RawContent::Json(Value::Object(obj)) => extract_fields(rules, RawItem::Json(obj)),
        RawContent::Json(_) => Err(AppError::ExtractionError(
            "detail response is not a JSON object".into(),
        )),
    }
}
