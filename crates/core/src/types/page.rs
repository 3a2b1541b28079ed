//! Paginated backend responses.

use serde::{Deserialize, Deserializer, Serialize};

/// One page of a listing (0-based `number`).
///
/// The backend returns pagination metadata in two shapes: flat next to
/// `content` (orders) or nested under `page` (products). Both deserialize
/// into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
    pub number: u32,
    pub size: u32,
}

impl<T> Page<T> {
    /// 1-based page number for display.
    #[must_use]
    pub const fn position(&self) -> u32 {
        self.number.saturating_add(1)
    }

    /// Whether a page after this one exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.position() < self.total_pages
    }

    /// Convert every item, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            number: self.number,
            size: self.size,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMeta {
    size: u32,
    number: u32,
    total_elements: u64,
    total_pages: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage<T> {
    content: Vec<T>,
    page: Option<PageMeta>,
    total_elements: Option<u64>,
    total_pages: Option<u32>,
    number: Option<u32>,
    size: Option<u32>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Page<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawPage::<T>::deserialize(deserializer)?;
        let len = u32::try_from(raw.content.len()).unwrap_or(u32::MAX);

        Ok(match raw.page {
            Some(meta) => Self {
                content: raw.content,
                total_elements: meta.total_elements,
                total_pages: meta.total_pages,
                number: meta.number,
                size: meta.size,
            },
            None => Self {
                total_elements: raw.total_elements.unwrap_or(u64::from(len)),
                total_pages: raw.total_pages.unwrap_or(u32::from(len > 0)),
                number: raw.number.unwrap_or(0),
                size: raw.size.unwrap_or(len),
                content: raw.content,
            },
        })
    }
}
