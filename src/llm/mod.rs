//! Language-model side of the pipeline
//!
//! instruction -> InstructionContext -> model routing answer -> resolved Action

pub mod client;
pub mod context;
pub mod parser;

pub use client::{CompletionBackend, LlmClient};
pub use context::InstructionContext;
pub use parser::parse_instruction;
