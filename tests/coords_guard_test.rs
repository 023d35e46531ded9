// Black-box coverage for Property P7 (coordinate guard), spec §4.C1
// "Coordinates".

use navbrain::model::BBox;
use navbrain::perception::{set_screen_size_if_unset, to_pixel_space};

/// Property P7: a bbox whose components are all in [0,1] converts to a
/// pixel-space center within the screen's (W, H) bounds.
#[test]
fn normalized_bbox_center_stays_within_screen_bounds() {
    set_screen_size_if_unset(2560.0, 1440.0);

    let normalized = BBox::new(0.95, 0.02, 0.04, 0.04);
    let pixel = to_pixel_space(normalized);
    let (cx, cy) = pixel.center();

    // The cache is process-global and set at most once; whatever size won
    // the race, the invariant must hold against it.
    let (w, h) = navbrain::perception::screen_size().expect("screen size was just set");
    assert!((0.0..=w).contains(&cx));
    assert!((0.0..=h).contains(&cy));
}

#[test]
fn pixel_space_bbox_is_unaffected_by_conversion() {
    let pixel_bbox = BBox::new(800.0, 600.0, 120.0, 40.0);
    assert_eq!(to_pixel_space(pixel_bbox), pixel_bbox);
}
