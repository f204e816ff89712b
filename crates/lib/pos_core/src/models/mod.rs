//! Wire and domain models shared by the client layers.

pub mod auth;
pub mod envelope;

pub use auth::{LoginData, RefreshData, Role, Session};
pub use envelope::{Envelope, ListEnvelope, ListQuery, Pagination};
