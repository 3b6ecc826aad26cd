//! Tab domain module.
//!
//! # Module Structure
//!
//! - `message`: Conversation message types (`Message`, `MessageRole`, `MessageMetadata`)
//! - `model`: Tab entity and partial updates (`ChatTab`, `TabPatch`, `AgentAction`)
//! - `store`: The tab collection and active-tab pointer (`TabStore`)

mod message;
mod model;
mod store;

pub use message::{Message, MessageMetadata, MessageRole, PLANNING_METADATA};
pub use model::{ActionStatus, AgentAction, ChatTab, TabMode, TabPatch, TabStatus};
pub use store::TabStore;
