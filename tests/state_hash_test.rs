// Black-box coverage for the State Hasher (spec §4.C2), properties P1-P2.

use navbrain::hash::hash_elements;
use navbrain::model::{BBox, ElementKind, UiElement};

fn el(kind: ElementKind, text: &str, bbox: (f64, f64, f64, f64)) -> UiElement {
    UiElement::new(kind)
        .with_text(text)
        .with_bbox(BBox::new(bbox.0, bbox.1, bbox.2, bbox.3))
}

/// Property P1: hash is invariant under permutation of the element list.
#[test]
fn hash_is_stable_across_element_order() {
    let a = vec![
        el(ElementKind::Button, "Save", (10.0, 10.0, 40.0, 20.0)),
        el(ElementKind::Button, "Cancel", (60.0, 10.0, 40.0, 20.0)),
        el(ElementKind::Text, "Unsaved changes", (0.0, 0.0, 200.0, 20.0)),
    ];
    let mut shuffled = a.clone();
    shuffled.swap(0, 2);
    shuffled.swap(1, 2);

    assert_eq!(hash_elements(&a), hash_elements(&shuffled));
}

/// Property P2: perturbing each bbox component by less than 10px leaves the
/// hash unchanged.
#[test]
fn hash_tolerates_sub_quantum_jitter_across_a_whole_screen() {
    let a = vec![
        el(ElementKind::Button, "Save", (10.0, 10.0, 40.0, 20.0)),
        el(ElementKind::Button, "Cancel", (60.0, 10.0, 40.0, 20.0)),
    ];
    let jittered = vec![
        el(ElementKind::Button, "Save", (15.9, 18.0, 49.9, 11.0)),
        el(ElementKind::Button, "Cancel", (69.9, 10.1, 45.0, 29.9)),
    ];

    assert_eq!(hash_elements(&a), hash_elements(&jittered));
}

#[test]
fn hash_differs_when_text_content_differs() {
    let a = vec![el(ElementKind::Button, "Save", (10.0, 10.0, 40.0, 20.0))];
    let b = vec![el(ElementKind::Button, "Delete", (10.0, 10.0, 40.0, 20.0))];
    assert_ne!(hash_elements(&a), hash_elements(&b));
}
