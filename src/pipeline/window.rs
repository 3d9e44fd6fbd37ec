//! Context windows: the immediate neighbors of a page, frozen before dispatch.
//!
//! A window is a pure function of the fully materialised raw-text sequence.
//! It is built from raw text only — never from cleaned text — so correcting
//! page k never depends on whether page k-1 or k+1 has already been
//! corrected. That independence is what makes every correction task safe to
//! run concurrently in any order.
//!
//! Windows are borrowed read-only views; the raw-text sequence is
//! write-once-then-read-only, populated entirely before any task starts, so
//! no locking is needed.

/// The raw text of a page's immediate neighbors, used only as disambiguation
/// context for its correction. Empty at document boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow<'a> {
    pub prev: &'a str,
    pub next: &'a str,
}

/// Build the window for 1-based page `page_num` over the materialised raw
/// texts. Out-of-bounds neighbors are empty: page 1 has no previous, the last
/// page has no next.
pub fn window(raw_texts: &[String], page_num: usize) -> ContextWindow<'_> {
    debug_assert!(page_num >= 1 && page_num <= raw_texts.len());
    let i = page_num - 1;
    ContextWindow {
        prev: if i > 0 { &raw_texts[i - 1] } else { "" },
        next: raw_texts.get(i + 1).map(String::as_str).unwrap_or(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("texto {i}")).collect()
    }

    #[test]
    fn middle_page_sees_both_neighbors() {
        let raw = pages(3);
        let w = window(&raw, 2);
        assert_eq!(w.prev, "texto 1");
        assert_eq!(w.next, "texto 3");
    }

    #[test]
    fn first_page_has_no_previous() {
        let raw = pages(3);
        let w = window(&raw, 1);
        assert_eq!(w.prev, "");
        assert_eq!(w.next, "texto 2");
    }

    #[test]
    fn last_page_has_no_next() {
        let raw = pages(3);
        let w = window(&raw, 3);
        assert_eq!(w.prev, "texto 2");
        assert_eq!(w.next, "");
    }

    #[test]
    fn single_page_document_has_empty_window() {
        let raw = pages(1);
        let w = window(&raw, 1);
        assert_eq!(w, ContextWindow { prev: "", next: "" });
    }

    #[test]
    fn window_never_contains_own_text() {
        let raw = pages(5);
        for n in 1..=5 {
            let w = window(&raw, n);
            let own = format!("texto {n}");
            assert_ne!(w.prev, own);
            assert_ne!(w.next, own);
        }
    }

    #[test]
    fn windows_are_deterministic_for_the_same_sequence() {
        let raw = pages(4);
        // Query in an arbitrary order; results depend only on the sequence.
        let out_of_order: Vec<_> = [3, 1, 4, 2].iter().map(|&n| window(&raw, n)).collect();
        let in_order: Vec<_> = [1, 2, 3, 4].iter().map(|&n| window(&raw, n)).collect();
        assert_eq!(out_of_order[1], in_order[0]);
        assert_eq!(out_of_order[3], in_order[1]);
        assert_eq!(out_of_order[0], in_order[2]);
        assert_eq!(out_of_order[2], in_order[3]);
    }

    #[test]
    fn neighbor_with_empty_raw_text_degrades_gracefully() {
        let raw = vec!["uno".to_string(), String::new(), "tres".to_string()];
        let w = window(&raw, 3);
        assert_eq!(w.prev, "");
        assert_eq!(w.next, "");
    }
}
