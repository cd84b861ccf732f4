//! Text and URL normalization, and the final `ExtractedFields -> Record` step.

use url::Url;

use crate::models::{ExtractedFields, Record};

/// Collapse every whitespace run to a single space and trim both ends.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Make `value` an absolute URL.
///
/// - `http://…` / `https://…` is returned unchanged
/// - protocol-relative `//host/…` gets an `https:` scheme
/// - anything else is resolved against `base`
///
/// An empty value stays empty. A value that cannot be resolved is returned
/// as given.
pub fn absolutize(value: &str, base: &str) -> String {
    let value = value.trim();
    if value.is_empty() || value.starts_with("http://") || value.starts_with("https://") {
        return value.to_string();
    }
    if let Some(rest) = value.strip_prefix("//") {
        return format!("https://{rest}");
    }
    Url::parse(base)
        .and_then(|base| base.join(value))
        .map(String::from)
        .unwrap_or_else(|_| value.to_string())
}

/// Keep only the ASCII digits of `value`, in order.
///
/// Grouping separators are dropped rather than split on, so `"1,234회"`
/// becomes `"1234"`.
pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Shape extracted fields into a [`Record`].
///
/// Collapses whitespace in every field and re-checks the title. Returns
/// `None` when the title is empty after collapsing. Normalizing a record's
/// own fields again yields the same record.
pub fn normalize(fields: ExtractedFields) -> Option<Record> {
    let clean = |value: Option<String>| value.map(|v| collapse_whitespace(&v));

    let title = collapse_whitespace(fields.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }

    Some(Record {
        title,
        author: clean(fields.author),
        price: clean(fields.price),
        description: clean(fields.description),
        published_at: clean(fields.published_at),
        detail_link: clean(fields.detail_link),
        cover_image: clean(fields.cover_image),
        external_id: clean(fields.external_id),
        sale_rank: clean(fields.sale_rank),
    })
}
