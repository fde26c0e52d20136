//! Page-number pagination shared by every feed.

use std::num::NonZeroU32;

/// A page number as requested through the `page` query parameter.
///
/// Absent or unparsable values fall back to the first page; the literal
/// `last` selects the final page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageNumber {
    Number(i64),
    Last,
}

impl PageNumber {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(value) = raw.map(str::trim) else {
            return Self::Number(1);
        };
        if value == "last" {
            return Self::Last;
        }
        value.parse::<i64>().map(Self::Number).unwrap_or(Self::Number(1))
    }

    /// Stable label used to key cached renderings of a page.
    pub fn cache_label(&self) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::Last => "last".to_string(),
        }
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::Number(1)
    }
}

/// Resolved position of one page within a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    number: u64,
    num_pages: u64,
    total: u64,
    per_page: u32,
}

impl PageWindow {
    /// Clamp the requested page into `1..=num_pages`. An empty collection has one empty page.
    pub fn resolve(total: u64, per_page: NonZeroU32, requested: PageNumber) -> Self {
        let per_page_u64 = u64::from(per_page.get());
        let num_pages = total.div_ceil(per_page_u64).max(1);
        let number = match requested {
            PageNumber::Last => num_pages,
            PageNumber::Number(value) if value < 1 => 1,
            PageNumber::Number(value) => (value as u64).min(num_pages),
        };

        Self {
            number,
            num_pages,
            total,
            per_page: per_page.get(),
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn num_pages(&self) -> u64 {
        self.num_pages
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u32 {
        self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_number(&self) -> Option<u64> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_number(&self) -> Option<u64> {
        self.has_previous().then_some(self.number - 1)
    }

    /// Number of items that belong on this page.
    pub fn len(&self) -> u64 {
        self.total
            .saturating_sub(self.offset())
            .min(u64::from(self.per_page))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One page of materialised items plus its window.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self { items, window }
    }
}
