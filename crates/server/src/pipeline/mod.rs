//! The two message entry points.

pub mod inbound;
pub mod outbound;

pub use inbound::{InboundPipeline, InboundWebhook, TWIML_ACK};
pub use outbound::{delete_failed_message, OutboundPipeline, SendOutcome};
