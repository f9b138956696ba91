//! Conversation domain.
//!
//! - [`entities::Message`]: a single role/content/metadata record
//! - [`entities::MessagePriority`]: priority stamped onto stored messages
//! - [`entities::validate_sequence`]: ordering rules checked at boundaries

pub mod entities;
