pub mod agents;
pub mod annotations;
pub mod client;
pub mod credentials;
pub mod error;
pub mod folders;
pub mod notes;
pub mod resources;
pub mod stories;
pub mod teams;

pub use client::Client;
pub use error::{ErrorMessage, ErrorType, TinesError};
