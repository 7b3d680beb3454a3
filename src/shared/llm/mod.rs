//! Parsing helpers for free-text replies from model-backed services.

mod parser;
mod response;

pub use parser::parse_with_fallback;
pub use response::LlmResponse;
