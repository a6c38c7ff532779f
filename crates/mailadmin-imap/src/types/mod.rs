//! Core IMAP types.
//!
//! Capabilities, status classification and quota values shared by the
//! codec and the session.

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod quota;

pub use capability::{Capabilities, Capability, Status};
pub use quota::Quota;
