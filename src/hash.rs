// State Hasher — spec §4.C2.
//
// Reduces a set of UI elements to a stable, position-quantized content hash.
// Grounded on the teacher's `sha2` dependency (`Cargo.toml`); the algorithm
// itself is new, since the teacher has no screen-state analogue.

use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::model::{BBox, ElementKind, UiElement};

/// Floor a bbox component to the nearest multiple of 10 pixels (spec §4.C2
/// step 1).
fn quantize(v: f64) -> i64 {
    (v / 10.0).floor() as i64 * 10
}

/// `(kind, text_lower_trimmed_or_empty, position_quantized_or_null)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct NormalizedElement {
    kind: ElementKind,
    text: String,
    position: Option<(i64, i64, i64, i64)>,
}

fn normalize(elements: &[UiElement]) -> Vec<NormalizedElement> {
    elements
        .iter()
        .map(|e| NormalizedElement {
            kind: e.kind,
            text: e
                .text
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_lowercase(),
            position: e
                .bbox
                .map(|b| (quantize(b.x), quantize(b.y), quantize(b.w), quantize(b.h))),
        })
        .collect()
}

/// Serialize one normalized element as `"<kind>:<text>:<x,y,w,h or 'none'>"`
/// (spec §4.C2 step 3).
fn element_token(e: &NormalizedElement) -> String {
    let kind = serde_json::to_value(e.kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", e.kind).to_lowercase());
    let pos = match e.position {
        Some((x, y, w, h)) => format!("{},{},{},{}", x, y, w, h),
        None => "none".to_string(),
    };
    format!("{}:{}:{}", kind, e.text, pos)
}

/// The State Hasher's core algorithm (spec §4.C2).
///
/// 1. Normalize (kind, lower/trimmed text, 10px-quantized position).
/// 2. Sort by kind, then text, then (x,y) — null positions sort first.
/// 3. Join with `|`.
/// 4. SHA-256 the UTF-8 bytes; take the first 16 hex chars.
///
/// Property P1 (permutation invariance) and P2 (sub-10px jitter tolerance)
/// both follow directly from steps 1–2.
pub fn hash_elements(elements: &[UiElement]) -> String {
    let mut normalized = normalize(elements);
    normalized.sort();

    let joined = normalized
        .iter()
        .map(element_token)
        .collect::<Vec<_>>()
        .join("|");

    let digest = Sha256::digest(joined.as_bytes());
    let hex = format!("{:x}", digest);
    hex[..16].to_string()
}

/// Jaccard similarity over lowercased non-empty texts (spec §4.C2
/// "Similarity" — supports future fuzzy matching, not required for basic
/// operation).
pub fn jaccard_similarity(a: &[UiElement], b: &[UiElement]) -> f64 {
    let set_a: HashSet<String> = a
        .iter()
        .filter_map(|e| e.text.as_deref())
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    let set_b: HashSet<String> = b
        .iter()
        .filter_map(|e| e.text.as_deref())
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox as Bb;

    fn element(kind: ElementKind, text: &str, bbox: Option<(f64, f64, f64, f64)>) -> UiElement {
        let mut e = UiElement::new(kind).with_text(text);
        if let Some((x, y, w, h)) = bbox {
            e = e.with_bbox(Bb::new(x, y, w, h));
        }
        e
    }

    /// Property P1: hash is invariant under permutation.
    #[test]
    fn hash_is_permutation_invariant() {
        let a = vec![
            element(ElementKind::Button, "OK", Some((10.0, 20.0, 50.0, 20.0))),
            element(ElementKind::Text, "Hello", Some((0.0, 0.0, 100.0, 30.0))),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(hash_elements(&a), hash_elements(&b));
    }

    /// Property P2: sub-10px jitter doesn't change the hash.
    #[test]
    fn hash_absorbs_sub_quantum_jitter() {
        let a = vec![element(
            ElementKind::Button,
            "OK",
            Some((10.0, 20.0, 50.0, 20.0)),
        )];
        let b = vec![element(
            ElementKind::Button,
            "OK",
            Some((14.9, 22.0, 58.9, 21.0)),
        )];
        assert_eq!(hash_elements(&a), hash_elements(&b));
    }

    #[test]
    fn hash_changes_across_quantization_boundary() {
        let a = vec![element(
            ElementKind::Button,
            "OK",
            Some((9.0, 0.0, 0.0, 0.0)),
        )];
        let b = vec![element(
            ElementKind::Button,
            "OK",
            Some((10.0, 0.0, 0.0, 0.0)),
        )];
        assert_ne!(hash_elements(&a), hash_elements(&b));
    }

    #[test]
    fn hash_is_16_hex_chars() {
        let h = hash_elements(&[element(ElementKind::Text, "x", None)]);
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn text_case_and_whitespace_normalized() {
        let a = vec![element(ElementKind::Text, "  Hello World  ", None)];
        let b = vec![element(ElementKind::Text, "hello world", None)];
        assert_eq!(hash_elements(&a), hash_elements(&b));
    }

    #[test]
    fn empty_element_list_hashes_deterministically() {
        assert_eq!(hash_elements(&[]), hash_elements(&[]));
    }

    #[test]
    fn null_positions_sort_before_present_positions() {
        // Just verifying no panic and a stable hash when mixing null/positioned.
        let a = vec![
            element(ElementKind::Text, "a", None),
            element(ElementKind::Text, "b", Some((1.0, 1.0, 1.0, 1.0))),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(hash_elements(&a), hash_elements(&b));
    }

    #[test]
    fn jaccard_identical_sets_is_one() {
        let a = vec![element(ElementKind::Text, "Hello", None)];
        assert_eq!(jaccard_similarity(&a, &a), 1.0);
    }

    #[test]
    fn jaccard_disjoint_sets_is_zero() {
        let a = vec![element(ElementKind::Text, "Hello", None)];
        let b = vec![element(ElementKind::Text, "World", None)];
        assert_eq!(jaccard_similarity(&a, &b), 0.0);
    }
}
