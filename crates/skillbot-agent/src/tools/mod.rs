//! Tool modules for the Skillbot agent.

pub mod base;
pub mod dispatcher;
pub mod execute;
pub mod extract;
pub mod read;

pub use base::{tool_definitions, ToolKind};
pub use dispatcher::{ToolDispatcher, ToolSettings};
pub use extract::{BuiltinExtractor, DocumentExtractor, DocumentKind};
