// Input-injection backend boundary — spec §6 "Action-execution interface",
// §9 "LLM provider dispatch" (same "interface over inheritance" idiom,
// applied to OS input).
//
// Grounded on the teacher's `LlmProvider` trait shape (`providers/mod.rs`):
// a small capability-bearing trait with one concrete, real implementation
// (here, macOS/core-graphics) rather than an inheritance hierarchy.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{Modifier, MouseButton};

/// The OS input subsystem. A singleton resource — only the Action Executor
/// touches it (spec §5 "Shared resources").
#[async_trait]
pub trait InputBackend: Send + Sync {
    async fn move_mouse(&self, x: f64, y: f64) -> Result<()>;

    async fn click(&self, x: f64, y: f64, button: MouseButton, double_click: bool) -> Result<()>;

    async fn type_text(&self, text: &str, delay_ms: u64) -> Result<()>;

    /// Press-and-release a single named key (e.g. "enter", "tab", "escape").
    async fn press_key(&self, key: &str, modifiers: &[Modifier]) -> Result<()>;

    async fn scroll(&self, amount: i32, direction_up: bool) -> Result<()>;

    /// Current primary display size in pixels (spec §4.C1 "Coordinates").
    fn screen_size(&self) -> Result<(f64, f64)>;
}

/// Stand-in backend for platforms with no concrete `InputBackend` yet (spec
/// §1: "Input-injection and screen-capture backends beyond the reference
/// implementation are an external collaborator's job"). Mirrors
/// `perception::ocr::UnavailableOcr`'s always-fail-cleanly shape so the
/// crate still builds off macOS.
pub struct UnavailableInputBackend;

#[async_trait]
impl InputBackend for UnavailableInputBackend {
    async fn move_mouse(&self, _x: f64, _y: f64) -> Result<()> {
        anyhow::bail!("no InputBackend available on this platform")
    }

    async fn click(&self, _x: f64, _y: f64, _button: MouseButton, _double_click: bool) -> Result<()> {
        anyhow::bail!("no InputBackend available on this platform")
    }

    async fn type_text(&self, _text: &str, _delay_ms: u64) -> Result<()> {
        anyhow::bail!("no InputBackend available on this platform")
    }

    async fn press_key(&self, _key: &str, _modifiers: &[Modifier]) -> Result<()> {
        anyhow::bail!("no InputBackend available on this platform")
    }

    async fn scroll(&self, _amount: i32, _direction_up: bool) -> Result<()> {
        anyhow::bail!("no InputBackend available on this platform")
    }

    fn screen_size(&self) -> Result<(f64, f64)> {
        anyhow::bail!("no InputBackend available on this platform")
    }
}
