/// Returns page `page_number` (zero-based) of `source`, `page_size` items long.
///
/// An absent source or a page past the end yields an empty slice.
pub fn paginate<T>(source: Option<&[T]>, page_size: usize, page_number: usize) -> &[T] {
    let Some(items) = source else {
        return &[];
    };

    let start = page_size.saturating_mul(page_number);
    if start >= items.len() {
        return &[];
    }

    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}
