//! Ordered assembly of per-page results into the final transcript.
//!
//! Pages are joined strictly in ascending page order regardless of the order
//! corrections completed in. A failed page never disappears silently: its
//! slot carries an explicit placeholder naming the page and the reason, so
//! the transcript's page coverage is always auditable.

use crate::output::PageResult;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Runs of three or more newlines collapse to one blank line, so pages whose
/// corrected text ends in trailing blank lines do not widen the separator.
static EXCESS_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex"));

/// Zero-padded sort key for page `page_num` of a `page_count`-page document.
///
/// Width grows with the document (minimum 3 digits) so lexicographic order
/// of scratch-file names matches numeric page order even past page 999.
pub fn page_key(page_num: usize, page_count: usize) -> String {
    let width = digits(page_count).max(3);
    format!("{page_num:0width$}")
}

fn digits(mut n: usize) -> usize {
    let mut d = 1;
    while n >= 10 {
        n /= 10;
        d += 1;
    }
    d
}

/// Placeholder emitted into the transcript where a page's correction failed.
pub fn failure_placeholder(result: &PageResult) -> String {
    let detail = result
        .error
        .as_ref()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "unknown error".to_string());
    format!("[page {} not corrected: {detail}]", result.page_num)
}

/// Join per-page results into one transcript, in page order.
///
/// Every page from 1 to `page_count` contributes exactly one slot: corrected
/// text for successes, a placeholder for failures, nothing visible for empty
/// pages (their slot is skipped so the transcript has no stray separators).
/// Assembly is idempotent over the same results map.
pub fn assemble(results: &BTreeMap<usize, PageResult>, page_count: usize) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(page_count);

    for page_num in 1..=page_count {
        // The scheduler guarantees one entry per page; a hole in the map is
        // still surfaced rather than silently shrinking the transcript.
        let Some(result) = results.get(&page_num) else {
            parts.push(format!("[page {page_num} missing]"));
            continue;
        };
        if result.error.is_some() {
            parts.push(failure_placeholder(result));
            continue;
        }
        let text = result.text.trim();
        if !text.is_empty() {
            parts.push(text.to_string());
        }
    }

    let joined = parts.join("\n\n");
    EXCESS_BLANK_LINES.replace_all(&joined, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ExtractionStrategy;
    use crate::error::PageError;

    fn ok(page_num: usize, text: &str) -> PageResult {
        PageResult {
            page_num,
            text: text.to_string(),
            strategy: ExtractionStrategy::EmbeddedText,
            attempts: 1,
            duration_ms: 0,
            error: None,
        }
    }

    fn failed(page_num: usize) -> PageResult {
        PageResult {
            page_num,
            text: String::new(),
            strategy: ExtractionStrategy::EmbeddedText,
            attempts: 5,
            duration_ms: 0,
            error: Some(PageError::CorrectionFailed {
                page: page_num,
                attempts: 5,
                detail: "rate limited".to_string(),
            }),
        }
    }

    fn results(pages: Vec<PageResult>) -> BTreeMap<usize, PageResult> {
        pages.into_iter().map(|p| (p.page_num, p)).collect()
    }

    #[test]
    fn pages_join_in_page_order() {
        let map = results(vec![ok(3, "tres"), ok(1, "uno"), ok(2, "dos")]);
        assert_eq!(assemble(&map, 3), "uno\n\ndos\n\ntres");
    }

    #[test]
    fn failed_page_leaves_an_attributed_placeholder() {
        let map = results(vec![ok(1, "uno"), failed(2), ok(3, "tres")]);
        let text = assemble(&map, 3);
        assert!(text.contains("uno"));
        assert!(text.contains("tres"));
        assert!(text.contains("[page 2 not corrected:"));
        assert!(text.contains("rate limited"));
    }

    #[test]
    fn empty_pages_add_no_separators() {
        let map = results(vec![ok(1, "uno"), ok(2, ""), ok(3, "tres")]);
        assert_eq!(assemble(&map, 3), "uno\n\ntres");
    }

    #[test]
    fn trailing_blank_lines_inside_pages_collapse() {
        let map = results(vec![ok(1, "uno\n\n\n"), ok(2, "dos")]);
        assert_eq!(assemble(&map, 2), "uno\n\ndos");
    }

    #[test]
    fn a_hole_in_the_results_map_leaves_a_visible_marker() {
        let map = results(vec![ok(1, "uno"), ok(3, "tres")]);
        let text = assemble(&map, 3);
        assert_eq!(text, "uno\n\n[page 2 missing]\n\ntres");
    }

    #[test]
    fn assembly_is_idempotent() {
        let map = results(vec![ok(1, "uno"), failed(2), ok(3, "tres")]);
        let first = assemble(&map, 3);
        let second = assemble(&map, 3);
        assert_eq!(first, second);
    }

    #[test]
    fn page_key_pads_to_three_digits_minimum() {
        assert_eq!(page_key(1, 9), "001");
        assert_eq!(page_key(42, 120), "042");
        assert_eq!(page_key(999, 999), "999");
    }

    #[test]
    fn page_key_widens_for_large_documents() {
        assert_eq!(page_key(7, 1200), "0007");
        assert_eq!(page_key(1000, 1200), "1000");
        // Lexicographic order matches numeric order at the width boundary.
        assert!(page_key(999, 1200) < page_key(1000, 1200));
    }
}
