//! Event routing

mod router;

pub use router::{EventRouter, RouterError, RouterResult};
