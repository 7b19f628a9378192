//! Prompt assembly.
//!
//! [`ContextAssembler`] lays out the instruction preamble, conversation
//! history, fetched sources and the query inside a char budget.
//! [`preamble`] holds the instruction variants.

pub mod assembler;
pub mod preamble;

pub use assembler::{
    AssembledPrompt, AssemblyError, AssemblyInput, AssemblyMetadata, ContextAssembler, DropInfo,
    PromptBudget,
};
pub use preamble::PreambleKind;
