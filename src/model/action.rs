// The Action vocabulary — spec §3 Action / ActionData.
//
// ActionData is a tagged sum type, not an inheritance hierarchy (spec §9
// Design Notes: "the original arrangement as an abstract class with
// subclass-per-action is a re-architecture target: prefer a discriminated
// record"). Grounded on the teacher's `ContentBlock` tagged-enum pattern
// (`#[serde(tag = "type")]`) in `tools/types.rs`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Command,
    Ctrl,
    Alt,
    Shift,
}

/// The closed set of dispatchable action variants (spec §3 ActionData).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionData {
    Click {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        x: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default = "default_button")]
        button: MouseButton,
        #[serde(default)]
        double_click: bool,
    },
    Type {
        text: String,
        #[serde(default)]
        press_enter: bool,
        #[serde(default)]
        delay_ms: u64,
    },
    Hotkey {
        keys: Vec<String>,
        #[serde(default)]
        modifiers: Vec<Modifier>,
    },
    Wait {
        milliseconds: u64,
    },
    Scroll {
        amount: i32,
        direction: ScrollDirection,
    },
}

fn default_button() -> MouseButton {
    MouseButton::Left
}

/// Validation error for a malformed Click (spec §3: "either coordinate-based
/// ... or text-based ...; never both").
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionValidationError {
    #[error("Click must specify either (x,y) or text, not both")]
    ClickBothCoordAndText,
    #[error("Click must specify either (x,y) or text, not neither")]
    ClickNeitherCoordNorText,
}

impl ActionData {
    /// Enforce the Click either/or invariant. Called at construction sites
    /// and again defensively by the executor before dispatch.
    pub fn validate(&self) -> Result<(), ActionValidationError> {
        if let ActionData::Click { x, y, text, .. } = self {
            let has_coords = x.is_some() && y.is_some();
            let has_text = text.is_some();
            match (has_coords, has_text) {
                (true, true) => return Err(ActionValidationError::ClickBothCoordAndText),
                (false, false) => return Err(ActionValidationError::ClickNeitherCoordNorText),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn click_at(x: f64, y: f64) -> Self {
        ActionData::Click {
            x: Some(x),
            y: Some(y),
            text: None,
            button: MouseButton::Left,
            double_click: false,
        }
    }

    pub fn click_text(text: impl Into<String>) -> Self {
        ActionData::Click {
            x: None,
            y: None,
            text: Some(text.into()),
            button: MouseButton::Left,
            double_click: false,
        }
    }

    pub fn type_text(text: impl Into<String>) -> Self {
        ActionData::Type {
            text: text.into(),
            press_enter: false,
            delay_ms: 0,
        }
    }

    pub fn hotkey(modifiers: Vec<Modifier>, keys: Vec<&str>) -> Self {
        ActionData::Hotkey {
            keys: keys.into_iter().map(String::from).collect(),
            modifiers,
        }
    }

    pub fn wait(milliseconds: u64) -> Self {
        ActionData::Wait { milliseconds }
    }
}

/// A single dispatchable step (spec §3 Action).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub data: ActionData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub retry_on_failure: bool,
}

impl Action {
    pub fn new(data: ActionData) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            description: None,
            retry_on_failure: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry_on_failure = retry;
        self
    }
}
