//! Watching a workload's process tree for the length of a session.
//!
//! Everything in here talks to the OS through [`ProcessSource`], and only the
//! [`session`] module knows about wall-clock time and the workload itself.
//!
//! [`ProcessSource`]: crate::collection::ProcessSource

pub mod aggregate;
pub mod interrupt;
pub mod sampler;
pub mod session;
pub mod terminate;
pub mod tree;
