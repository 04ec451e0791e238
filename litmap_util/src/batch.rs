/// Splits `items` into a lazy sequence of fixed-size pages (spec §9
/// "Streaming big collections" — pages, never the full in-memory list, are
/// what downstream calls like `bulk_upsert` actually operate on).
///
/// The last page may be shorter than `size`. Panics if `size == 0`.
pub fn batches<T>(items: Vec<T>, size: usize) -> impl Iterator<Item = Vec<T>> {
    assert!(size > 0, "batch size must be non-zero");
    let mut items = items.into_iter();
    std::iter::from_fn(move || {
        let mut page = Vec::with_capacity(size);
        for _ in 0..size {
            match items.next() {
                Some(item) => page.push(item),
                None => break,
            }
        }
        if page.is_empty() {
            None
        } else {
            Some(page)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_fixed_size_pages() {
        let pages: Vec<_> = batches(vec![1, 2, 3, 4, 5], 2).collect();
        assert_eq!(pages, vec![vec![1, 2], vec![3, 4], vec![5]]);
    }

    #[test]
    fn empty_input_yields_no_pages() {
        let pages: Vec<Vec<i32>> = batches(vec![], 10).collect();
        assert!(pages.is_empty());
    }

    #[test]
    fn exact_multiple_yields_equal_pages() {
        let pages: Vec<_> = batches(vec![1, 2, 3, 4], 2).collect();
        assert_eq!(pages, vec![vec![1, 2], vec![3, 4]]);
    }
}
