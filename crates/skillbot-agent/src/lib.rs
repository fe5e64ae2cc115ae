//! Skillbot Agent: skills, tools, sessions and the orchestrator.
//!
//! This crate contains:
//! - **skills**: skill discovery, manifests and the active selection
//! - **context**: system prompt and per-skill context assembly
//! - **tools**: the `read_file` / `execute_script` capabilities and their dispatcher
//! - **session**: conversation sessions for managed and explicit tool loops
//! - **retry**: rate-limit backoff around provider calls
//! - **orchestrator**: routes user input to activation and the session

pub mod context;
pub mod orchestrator;
pub mod retry;
pub mod session;
pub mod skills;
pub mod tools;

pub use context::ContextAssembler;
pub use orchestrator::{Orchestrator, TurnReply};
pub use retry::{RetryOutcome, RetryPolicy, TIMEOUT_SENTINEL};
pub use session::{build_session, ConversationSession, ExplicitToolSession, ManagedToolSession};
pub use skills::{SkillRecord, SkillRegistry};
pub use tools::{ToolDispatcher, ToolKind, ToolSettings};
