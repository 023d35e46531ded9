// Screen capture — spec §4.C1 captureScreenBuffer.
//
// Grounded on `examples/other_examples/manifests/mediar-ai-terminator/Cargo.toml`
// (`xcap` + `image`), since the teacher's own `tools/implementations/gui.rs`
// only ever got as far as `CGDisplay` geometry (`inspect_screen`) and left
// the actual pixel capture as a documented placeholder.

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use xcap::Monitor;

use super::coords::set_screen_size_if_unset;

pub type PngBytes = Vec<u8>;

/// A screen-capture backend, swappable the same way [`super::OcrBackend`]
/// is — so a fake backend can drive `BrainController` headlessly in tests
/// (see `tests/navigate_to_test.rs`).
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    async fn capture(&self) -> Result<PngBytes>;
}

/// The real backend: the primary display via `xcap`.
pub struct SystemCapture;

#[async_trait]
impl CaptureBackend for SystemCapture {
    async fn capture(&self) -> Result<PngBytes> {
        capture_screen_buffer()
    }
}

/// Capture the primary display to PNG bytes. Synchronous on the calling
/// task (spec §4.C1). Capture errors are fatal for the current
/// identification attempt (§4.C1 "Failure policy").
pub fn capture_screen_buffer() -> Result<PngBytes> {
    let monitors = Monitor::all().context("failed to enumerate monitors")?;
    let primary = monitors
        .into_iter()
        .find(|m| m.is_primary().unwrap_or(false))
        .or_else(|| Monitor::all().ok().and_then(|mut v| v.pop()))
        .context("no monitor available to capture")?;

    let image = primary.capture_image().context("failed to capture screen")?;
    let rgba: RgbaImage = image;

    set_screen_size_if_unset(rgba.width() as f64, rgba.height() as f64);

    let mut buf = Vec::new();
    {
        use std::io::Cursor;
        rgba.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .context("failed to encode screenshot as PNG")?;
    }
    Ok(buf)
}
