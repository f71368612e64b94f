//! Player presence and authentication for Tricard.
//!
//! This crate knows who is online:
//!
//! 1. **Authentication**: checking credentials ([`Authenticator`] trait,
//!    with [`StoredAccounts`] checking hashed passwords in the match store)
//! 2. **Presence**: one entry per logged-in username with its status,
//!    current room and outbound mailbox ([`PlayerRegistry`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← updates presence when players join, start, leave
//!     ↕
//! Session Layer (this crate)  ← player identity and presence
//!     ↕
//! Protocol Layer (below)  ← Username, RoomName, PlayerStatus, Event
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod registry;

pub use auth::{Authenticator, StoredAccounts, password_hash};
pub use error::SessionError;
pub use registry::{PlayerRegistry, Presence};
