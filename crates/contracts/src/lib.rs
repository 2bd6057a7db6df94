//! # Contracts
//!
//! Frozen interface contracts, defining the data structures and traits shared
//! by every crate in the workspace. Business crates depend on this crate,
//! reverse dependencies are prohibited.
//!
//! ## Flow Model
//! - A [`Message`] travels through bounded [`Queue`]s
//! - Each [`Stage`] owns one [`Pipe`]: read inbound, write outbound, close when done
//! - Cancellation is carried by a `CancellationToken` passed into every stage

mod blueprint;
mod error;
mod message;
mod pipe;
mod stage;

pub use blueprint::*;
pub use error::*;
pub use message::*;
pub use pipe::*;
pub use stage::*;

pub use async_channel::TrySendError;
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
