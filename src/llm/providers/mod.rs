// Concrete provider implementations — spec §4.C4 "Capability matrix".
//
// Four provider styles cover the matrix's four rows; each is grounded on the
// teacher's corresponding provider file (see DESIGN.md).

pub mod anthropic_style;
pub mod gemini_style;
pub mod local_http;
pub mod openai_style;

pub use anthropic_style::AnthropicStyleProvider;
pub use gemini_style::GeminiStyleProvider;
pub use local_http::LocalHttpProvider;
pub use openai_style::OpenAiStyleProvider;
