// macOS input backend — spec §4.C7 "Per-variant semantics".
//
// Grounded on the teacher's `tools::implementations::gui::inspect_screen`
// (the one working `core_graphics::display::CGDisplay` call in that
// module) and its declared-but-unimplemented `gui_click`/`gui_type` tools
// ("TODO: Implement using core-graphics" — this is that implementation).

#![cfg(target_os = "macos")]

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use core_graphics::display::CGDisplay;
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTapLocation, CGEventType, CGKeyCode, CGMouseButton,
};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;

use super::backend::InputBackend;
use crate::model::{Modifier, MouseButton};

pub struct MacosInputBackend {
    source: CGEventSource,
}

impl MacosInputBackend {
    pub fn new() -> Result<Self> {
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| anyhow::anyhow!("failed to create CGEventSource"))?;
        Ok(Self { source })
    }

    fn mouse_button(button: MouseButton) -> CGMouseButton {
        match button {
            MouseButton::Left => CGMouseButton::Left,
            MouseButton::Right => CGMouseButton::Right,
            MouseButton::Middle => CGMouseButton::Center,
        }
    }

    fn post_mouse_event(&self, point: CGPoint, event_type: CGEventType, button: CGMouseButton) -> Result<()> {
        let event = CGEvent::new_mouse_event(self.source.clone(), event_type, point, button)
            .map_err(|_| anyhow::anyhow!("failed to create mouse event"))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    fn click_events(button: MouseButton) -> (CGEventType, CGEventType) {
        match button {
            MouseButton::Left => (CGEventType::LeftMouseDown, CGEventType::LeftMouseUp),
            MouseButton::Right => (CGEventType::RightMouseDown, CGEventType::RightMouseUp),
            MouseButton::Middle => (CGEventType::OtherMouseDown, CGEventType::OtherMouseUp),
        }
    }

    fn post_key_event(&self, keycode: CGKeyCode, key_down: bool, flags: CGEventFlags) -> Result<()> {
        let event = CGEvent::new_keyboard_event(self.source.clone(), keycode, key_down)
            .map_err(|_| anyhow::anyhow!("failed to create keyboard event"))?;
        event.set_flags(flags);
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    fn modifiers_to_flags(modifiers: &[Modifier]) -> CGEventFlags {
        let mut flags = CGEventFlags::empty();
        for m in modifiers {
            flags |= match m {
                Modifier::Command => CGEventFlags::CGEventFlagCommand,
                Modifier::Ctrl => CGEventFlags::CGEventFlagControl,
                Modifier::Alt => CGEventFlags::CGEventFlagAlternate,
                Modifier::Shift => CGEventFlags::CGEventFlagShift,
            };
        }
        flags
    }
}

/// macOS virtual keycode for a subset of keys the Action vocabulary needs
/// (letters, digits, and the named keys used by `press_key`/Hotkey).
fn keycode_for(key: &str) -> Option<CGKeyCode> {
    let code = match key.to_lowercase().as_str() {
        "a" => 0, "s" => 1, "d" => 2, "f" => 3, "h" => 4, "g" => 5, "z" => 6, "x" => 7,
        "c" => 8, "v" => 9, "b" => 11, "q" => 12, "w" => 13, "e" => 14, "r" => 15,
        "y" => 16, "t" => 17, "1" => 18, "2" => 19, "3" => 20, "4" => 21, "6" => 22,
        "5" => 23, "=" => 24, "9" => 25, "7" => 26, "-" => 27, "8" => 28, "0" => 29,
        "]" => 30, "o" => 31, "u" => 32, "[" => 33, "i" => 34, "p" => 35,
        "l" => 37, "j" => 38, "k" => 40, "n" => 45, "m" => 46,
        "enter" | "return" => 36,
        "tab" => 48,
        "space" => 49,
        "escape" | "esc" => 53,
        _ => return None,
    };
    Some(code)
}

#[async_trait]
impl InputBackend for MacosInputBackend {
    async fn move_mouse(&self, x: f64, y: f64) -> Result<()> {
        self.post_mouse_event(
            CGPoint::new(x, y),
            CGEventType::MouseMoved,
            CGMouseButton::Left,
        )
    }

    /// Click (or double-click) at the given pixel point (spec §4.C7
    /// "Click with (x,y)": "move pointer, click with the specified button,
    /// settle 200 ms").
    async fn click(&self, x: f64, y: f64, button: MouseButton, double_click: bool) -> Result<()> {
        let point = CGPoint::new(x, y);
        let (down, up) = Self::click_events(button);
        let cg_button = Self::mouse_button(button);

        self.move_mouse(x, y).await?;

        let clicks = if double_click { 2 } else { 1 };
        for _ in 0..clicks {
            self.post_mouse_event(point, down, cg_button)?;
            self.post_mouse_event(point, up, cg_button)?;
        }

        thread::sleep(Duration::from_millis(200));
        Ok(())
    }

    /// Emit characters with an inter-key delay (spec §4.C7 "Type").
    async fn type_text(&self, text: &str, delay_ms: u64) -> Result<()> {
        for ch in text.chars() {
            let key = ch.to_string();
            if let Some(keycode) = keycode_for(&key) {
                let flags = if ch.is_uppercase() {
                    CGEventFlags::CGEventFlagShift
                } else {
                    CGEventFlags::empty()
                };
                self.post_key_event(keycode, true, flags)?;
                self.post_key_event(keycode, false, flags)?;
            } else {
                tracing::warn!("no keycode mapping for character {:?}; skipping", ch);
            }
            if delay_ms > 0 {
                thread::sleep(Duration::from_millis(delay_ms));
            }
        }
        Ok(())
    }

    /// Spec §4.C7 "Hotkey": press all modifiers, sleep ~50ms, press-and-
    /// release each main key in order with ~20ms between, sleep ~10ms,
    /// release modifiers.
    async fn press_key(&self, key: &str, modifiers: &[Modifier]) -> Result<()> {
        let keycode = keycode_for(key).with_context(|| format!("unmapped key {key:?}"))?;
        let flags = Self::modifiers_to_flags(modifiers);

        thread::sleep(Duration::from_millis(50));
        self.post_key_event(keycode, true, flags)?;
        thread::sleep(Duration::from_millis(20));
        self.post_key_event(keycode, false, flags)?;
        thread::sleep(Duration::from_millis(10));

        Ok(())
    }

    async fn scroll(&self, amount: i32, direction_up: bool) -> Result<()> {
        let delta = if direction_up { amount } else { -amount };
        let event = CGEvent::new_scroll_event(
            self.source.clone(),
            core_graphics::event::ScrollEventUnit::LINE,
            1,
            delta,
            0,
            0,
        )
        .map_err(|_| anyhow::anyhow!("failed to create scroll event"))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    fn screen_size(&self) -> Result<(f64, f64)> {
        let display = CGDisplay::main();
        let bounds = display.bounds();
        Ok((bounds.size.width, bounds.size.height))
    }
}
