// Perception — spec §4.C1.
//
// Capture the primary display to PNG bytes; optionally run OCR. Coordinate
// normalization lives in `coords`, since both the executor (text-based
// click targeting) and the brain's verification step need the same guard.

pub mod capture;
pub mod coords;
pub mod ocr;

pub use capture::{capture_screen_buffer, CaptureBackend, PngBytes, SystemCapture};
pub use coords::{screen_size, set_screen_size_if_unset, to_pixel_space};
pub use ocr::{OcrAnalysis, OcrBackend, OcrElement, UnavailableOcr};

use std::sync::Arc;

use crate::model::{ElementKind, UiElement};

/// Run capture + best-effort OCR, returning whatever elements were
/// recognized (empty if OCR is unavailable — §4.C1 "Failure policy").
pub async fn analyze_current_screen(
    ocr: &Arc<dyn OcrBackend>,
) -> anyhow::Result<(PngBytes, Option<OcrAnalysis>)> {
    let png = capture_screen_buffer()?;
    let ocr_result = ocr.analyze(&png).await;
    Ok((png, ocr_result))
}

/// Synthesize `UiElement`s from raw OCR boxes (used as the VLM's
/// `identifyUIElements` fallback when OCR is available — spec §4.C3).
pub fn elements_from_ocr(analysis: &OcrAnalysis) -> Vec<UiElement> {
    analysis
        .elements
        .iter()
        .map(|e| {
            let bbox = to_pixel_space(e.bbox);
            UiElement::new(ElementKind::Text)
                .with_text(e.text.clone())
                .with_bbox(bbox)
                .with_confidence(e.confidence)
        })
        .collect()
}
