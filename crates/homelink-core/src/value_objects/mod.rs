//! Value objects
//!
//! Opaque identifier newtypes shared by the relay and the client session.

mod ids;

pub use ids::{ListingId, MessageId, UserId};
