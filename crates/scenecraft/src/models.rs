//! These models represent the objects passed between the agent, the completion
//! providers and the callers driving a scene.
//!
//! Messages are kept as plain role/content pairs since that is both what the
//! chat completion endpoints consume and what is persisted for audit. Anything
//! richer (image attachments, typed command responses) is layered on top.
pub mod message;
pub mod response;
pub mod role;
