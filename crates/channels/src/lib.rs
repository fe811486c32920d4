//! SMS channel plumbing for textpilot.
//!
//! - [`twilio`]: outbound REST client implementing `MessagingService`
//! - [`signature`]: inbound webhook signature validation
//! - [`twiml`]: the XML reply envelope returned to the webhook

pub mod signature;
pub mod twilio;
pub mod twiml;

pub use signature::{RequestValidator, SIGNATURE_HEADER};
pub use twilio::{TwilioClient, TwilioConfig};
