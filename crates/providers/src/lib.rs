//! Language model provider implementations for textpilot.
//!
//! All providers implement the `textpilot_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
