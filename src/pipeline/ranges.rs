//! Page-range expressions for split and delete.
//!
//! An expression is a comma-separated list of 1-based page numbers (`5`) and
//! inclusive ranges (`2-4`). Whitespace around tokens is ignored. A range
//! token uses its first two `-`-separated sides; an empty side counts as 0,
//! so `-3` means pages 1 to 3 and `1-2-3` means pages 1 and 2. Numbers may be
//! written with an integral decimal part (`5.0`). Tokens that do not parse,
//! fall outside the document, or describe a reversed range are dropped
//! without error; the callers decide what an empty result means.

use crate::error::ConvertError;
use std::collections::BTreeSet;

/// Parse `expr` against a document of `page_count` pages.
///
/// Returns ascending, de-duplicated, zero-based page indices.
///
/// ```
/// use convertkit::pipeline::ranges::parse_page_range;
///
/// assert_eq!(parse_page_range("1-3, 5", 10), vec![0, 1, 2, 4]);
/// assert_eq!(parse_page_range("3,1,3", 5), vec![0, 2]);
/// assert!(parse_page_range("20", 5).is_empty());
/// ```
pub fn parse_page_range(expr: &str, page_count: usize) -> Vec<usize> {
    let mut pages = BTreeSet::new();
    let total = page_count as i64;

    for part in expr.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if part.contains('-') {
            let mut sides = part.split('-');
            let (Some(start), Some(end)) = (
                sides.next().and_then(page_number),
                sides.next().and_then(page_number),
            ) else {
                continue;
            };
            // A fractional start never lands on a whole page.
            if start.fract() != 0.0 {
                continue;
            }
            // Only the in-document part of the range is walked.
            let lo = start.max(1.0) as i64;
            let hi = end.floor().min(total as f64) as i64;
            for page in lo..=hi {
                pages.insert((page - 1) as usize);
            }
        } else if let Some(page) = page_number(part) {
            if page.fract() == 0.0 && page >= 1.0 && page <= total as f64 {
                pages.insert(page as usize - 1);
            }
        }
    }

    pages.into_iter().collect()
}

/// One side of a token as a number. Blank is 0; non-finite values are rejected.
fn page_number(side: &str) -> Option<f64> {
    let side = side.trim();
    if side.is_empty() {
        return Some(0.0);
    }
    side.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Pages to extract for a split.
pub fn select_pages(expr: &str, page_count: usize) -> Result<Vec<usize>, ConvertError> {
    if expr.trim().is_empty() {
        return Err(ConvertError::MissingPageRange { action: "extract" });
    }
    let pages = parse_page_range(expr, page_count);
    if pages.is_empty() {
        return Err(ConvertError::InvalidRange { total: page_count });
    }
    Ok(pages)
}

/// Pages that survive deleting `expr` from the document.
pub fn pages_to_keep(expr: &str, page_count: usize) -> Result<Vec<usize>, ConvertError> {
    if expr.trim().is_empty() {
        return Err(ConvertError::MissingPageRange { action: "delete" });
    }
    let doomed: BTreeSet<usize> = parse_page_range(expr, page_count).into_iter().collect();
    if doomed.is_empty() {
        return Err(ConvertError::InvalidDeleteRange { total: page_count });
    }
    let keep: Vec<usize> = (0..page_count).filter(|i| !doomed.contains(i)).collect();
    if keep.is_empty() {
        return Err(ConvertError::CannotDeleteAllPages);
    }
    Ok(keep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_page() {
        assert_eq!(parse_page_range("5", 10), vec![4]);
    }

    #[test]
    fn mixed_ranges_and_pages() {
        assert_eq!(
            parse_page_range("1-3, 5, 8-10", 10),
            vec![0, 1, 2, 4, 7, 8, 9]
        );
    }

    #[test]
    fn overlapping_ranges_are_merged() {
        assert_eq!(parse_page_range("1-4, 3-6", 10), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn out_of_range_and_garbage_dropped() {
        assert_eq!(parse_page_range("0, 11, abc, 2", 10), vec![1]);
        assert_eq!(parse_page_range("2.5, 1.5-3, inf, 1-NaN", 10), Vec::<usize>::new());
    }

    #[test]
    fn extra_range_sides_are_ignored() {
        assert_eq!(parse_page_range("1-2-3", 10), vec![0, 1]);
        assert_eq!(parse_page_range("1-2-3, 5", 10), vec![0, 1, 4]);
    }

    #[test]
    fn integral_decimals_count_as_pages() {
        assert_eq!(parse_page_range("5.0", 10), vec![4]);
        assert_eq!(parse_page_range("2.0-3.9", 10), vec![1, 2]);
    }

    #[test]
    fn range_is_clipped_to_document() {
        assert_eq!(parse_page_range("8-20", 10), vec![7, 8, 9]);
        assert_eq!(parse_page_range("0-2", 10), vec![0, 1]);
    }

    #[test]
    fn reversed_range_contributes_nothing() {
        assert!(parse_page_range("5-3", 10).is_empty());
    }

    #[test]
    fn blank_range_side_is_zero() {
        assert_eq!(parse_page_range("-3", 10), vec![0, 1, 2]);
        assert!(parse_page_range("3-", 10).is_empty());
        assert!(parse_page_range("1--3", 10).is_empty());
    }

    #[test]
    fn huge_range_does_not_walk_past_document() {
        assert_eq!(parse_page_range("1-4000000000", 3), vec![0, 1, 2]);
    }

    #[test]
    fn split_needs_an_expression() {
        let err = select_pages("  ", 4).unwrap_err();
        assert_eq!(err.to_string(), "Please enter page numbers to extract.");
    }

    #[test]
    fn split_with_nothing_valid() {
        assert!(matches!(
            select_pages("9", 4),
            Err(ConvertError::InvalidRange { total: 4 })
        ));
    }

    #[test]
    fn delete_keeps_complement() {
        assert_eq!(pages_to_keep("2,4", 5).unwrap(), vec![0, 2, 4]);
    }

    #[test]
    fn delete_everything_rejected() {
        assert!(matches!(
            pages_to_keep("1-5", 5),
            Err(ConvertError::CannotDeleteAllPages)
        ));
        assert!(matches!(
            pages_to_keep("7", 5),
            Err(ConvertError::InvalidDeleteRange { total: 5 })
        ));
    }
}
