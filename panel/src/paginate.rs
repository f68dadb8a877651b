//! Splitting ordered `(key, record)` lists into fixed-size pages

/// Page count reported when pagination fails
pub const FAILED_PAGES: i64 = -1;

/// Chunk size reported when pagination fails
pub const FAILED_CHUNK: i64 = -2;

/// Result of [`paginate`]
#[derive(Debug, Clone, PartialEq)]
pub struct Pagination<T> {
    pub pages: Vec<Vec<(String, T)>>,
    pub page_count: i64,
    pub chunk: i64,
}

impl<T> Pagination<T> {
    /// Negative sentinels mean the list could not be paginated and must not be laid out
    pub fn is_failed(&self) -> bool {
        self.page_count < 0 || self.chunk < 0
    }
}

/// Number of pages needed for `n` entries at `items` per page, at least one
pub fn page_hint(n: usize, items: usize) -> i64 {
    if items == 0 {
        return 1;
    }
    (n.div_ceil(items) as i64).max(1)
}

/// Pad `entries` with placeholder pairs and split it into pages of `chunk`.
///
/// `pages` is a hint: when `pages * chunk` cannot hold every entry it is
/// raised by one, and only by one, so a badly under-sized hint yields a
/// short trailing slice beyond the reported page count.
pub fn paginate<T: Default + Clone>(
    entries: Vec<(String, T)>,
    pages: i64,
    chunk: i64,
) -> Pagination<T> {
    let failed = |entries| Pagination {
        pages: vec![entries],
        page_count: FAILED_PAGES,
        chunk: FAILED_CHUNK,
    };

    if chunk <= 0 || pages < 0 {
        return failed(entries);
    }

    let len = entries.len() as i64;
    let mut pages = pages;
    match pages.checked_mul(chunk) {
        Some(capacity) if capacity < len => pages += 1,
        Some(_) => {}
        None => return failed(entries),
    }

    let capacity = match pages
        .checked_mul(chunk)
        .and_then(|c| usize::try_from(c).ok())
    {
        Some(capacity) => capacity,
        None => return failed(entries),
    };

    let mut padded = entries;
    if padded.len() < capacity {
        padded.resize(capacity, (String::new(), T::default()));
    }

    let slices = padded
        .chunks(chunk as usize)
        .map(|page| page.to_vec())
        .collect();

    Pagination {
        pages: slices,
        page_count: pages,
        chunk,
    }
}
