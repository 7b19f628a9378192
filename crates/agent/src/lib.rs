//! The localseek turn pipeline.
//!
//! Each turn follows a **Fetch → Assemble → Stream → Record** cycle:
//!
//! 1. **Receive** a line of user input and parse it as a [`SessionCommand`]
//! 2. **Fetch** web search results or a video transcript
//! 3. **Assemble** a bounded prompt (preamble, history, sources, query)
//! 4. **Stream** the model's answer to the caller as it arrives
//! 5. **Record** the completed exchange in the bounded history
//!
//! A failure at any step ends the turn without touching history; a failed
//! fetch only removes the sources from the prompt.

pub mod command;
pub mod context;
pub mod session;

pub use command::SessionCommand;
pub use context::{
    AssembledPrompt, AssemblyError, AssemblyInput, AssemblyMetadata, ContextAssembler, DropInfo,
    PreambleKind, PromptBudget,
};
pub use session::{Session, SessionSettings, TurnOutcome, TurnSink};
