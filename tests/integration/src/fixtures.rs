//! Shared test fixtures

use homelink_core::{ClientEvent, UserId};

/// Build a message send event between two users
pub fn message(from: &str, to: &str, body: &str) -> ClientEvent {
    ClientEvent::MessageSend {
        from: UserId::new(from),
        to: UserId::new(to),
        body: body.to_string(),
        listing_id: None,
        listing_name: None,
    }
}

/// Build a join event
pub fn join(user: &str) -> ClientEvent {
    ClientEvent::Join {
        user_id: UserId::new(user),
    }
}
