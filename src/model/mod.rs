// Core data model — spec §3.

pub mod action;
pub mod node;
pub mod path;

pub use action::{Action, ActionData, ActionValidationError, Modifier, MouseButton, ScrollDirection};
pub use node::{BBox, ElementKind, Node, NodeId, UiElement};
pub use path::{
    LearnedBy, OcrVerificationSummary, Path, PathMetadata, PathValidation, PathVerification,
    VlmVerificationSummary,
};
