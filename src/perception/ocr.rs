// OCR backend trait + result shape — spec §4.C1.
//
// The OCR backend may be absent on the platform; callers MUST tolerate
// absence by continuing with `elements = []` and no `ocr_result` (§4.C1
// "Failure policy"). The concrete backend is an external-collaborator
// concern per §1 Out of scope — this module ships the interface plus a
// reference implementation gated behind the `ocr` feature (see DESIGN.md:
// grounded on the `uni-ocr` pin in the mediar-ai-terminator manifest).

use async_trait::async_trait;

use crate::model::BBox;

#[derive(Debug, Clone, PartialEq)]
pub struct OcrElement {
    pub text: String,
    pub confidence: f32,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcrAnalysis {
    pub full_text: String,
    pub elements: Vec<OcrElement>,
    pub platform: String,
}

/// An OCR backend. Implementations may be entirely absent from a given
/// platform build — see [`UnavailableOcr`].
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Returns `None` when the backend cannot run (§4.C1: "OCR errors are
    /// non-fatal; log and return `Unavailable`").
    async fn analyze(&self, png_bytes: &[u8]) -> Option<OcrAnalysis>;
}

/// The default backend when the `ocr` feature is disabled, or when no
/// concrete backend was injected. Always reports unavailable, matching
/// §4.C1's explicit tolerance for OCR absence.
pub struct UnavailableOcr;

#[async_trait]
impl OcrBackend for UnavailableOcr {
    async fn analyze(&self, _png_bytes: &[u8]) -> Option<OcrAnalysis> {
        tracing::warn!("OCR backend unavailable; continuing with empty elements");
        None
    }
}

#[cfg(feature = "ocr")]
pub mod uni_ocr_backend {
    use super::*;

    /// Reference OCR backend wrapping the `uni-ocr` crate (feature `ocr`).
    ///
    /// Grounded on the `uni-ocr` pin in
    /// `examples/other_examples/manifests/mediar-ai-terminator/Cargo.toml`.
    pub struct UniOcrBackend;

    #[async_trait]
    impl OcrBackend for UniOcrBackend {
        async fn analyze(&self, png_bytes: &[u8]) -> Option<OcrAnalysis> {
            match uni_ocr::recognize(png_bytes).await {
                Ok(result) => Some(OcrAnalysis {
                    full_text: result.text,
                    elements: result
                        .boxes
                        .into_iter()
                        .map(|b| OcrElement {
                            text: b.text,
                            confidence: b.confidence,
                            bbox: BBox::new(b.x, b.y, b.w, b.h),
                        })
                        .collect(),
                    platform: std::env::consts::OS.to_string(),
                }),
                Err(e) => {
                    tracing::warn!("OCR backend failed: {e}");
                    None
                }
            }
        }
    }
}
