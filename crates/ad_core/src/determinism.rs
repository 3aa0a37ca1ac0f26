//! Determinism utilities: stable ordering that does not depend on the sort
//! algorithm, and the name collation used by ranking and option listings.
//!
//! This module is **I/O-free**.

use core::cmp::Ordering;

/* -------------------------------------------------------------------------- */
/*                           Index-tagged stable sort                          */
/* -------------------------------------------------------------------------- */

/// Sort `items` by `cmp`, breaking ties by original position.
///
/// Each item is paired with its input index and the pair is compared as
/// `(cmp, index)`, so the result is identical whether or not the underlying
/// sort is stable. Only `cmp` should ever be reversed by callers; the index
/// tie-break always runs ascending.
pub fn sort_stable_indexed<T, F>(items: Vec<T>, mut cmp: F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut tagged: Vec<(usize, T)> = items.into_iter().enumerate().collect();
    tagged.sort_unstable_by(|(ia, a), (ib, b)| cmp(a, b).then_with(|| ia.cmp(ib)));
    tagged.into_iter().map(|(_, t)| t).collect()
}

/* -------------------------------------------------------------------------- */
/*                               Name collation                                */
/* -------------------------------------------------------------------------- */

/// Fold a display name for comparison: Unicode lowercase, common Latin
/// diacritics stripped, surrounding whitespace ignored.
pub fn collation_key(s: &str) -> String {
    s.trim().chars().flat_map(char::to_lowercase).map(strip_diacritic).collect()
}

fn strip_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'ē' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'ñ' | 'ń' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' => 'u',
        'ý' | 'ÿ' => 'y',
        'š' | 'ś' => 's',
        'ž' | 'ź' | 'ż' => 'z',
        other => other,
    }
}

/// Locale-style name order: case- and accent-insensitive.
/// Names that fold to the same key compare `Equal`.
#[inline]
pub fn cmp_names(a: &str, b: &str) -> Ordering {
    collation_key(a).cmp(&collation_key(b))
}

/// Total order over metric values. NaN and `-0.0` compare as zero.
#[inline]
pub fn cmp_metric(a: f64, b: f64) -> Ordering {
    let fix = |x: f64| if x.is_nan() || x == 0.0 { 0.0 } else { x };
    fix(a).total_cmp(&fix(b))
}

/* ---------------------------------- Tests --------------------------------- */
