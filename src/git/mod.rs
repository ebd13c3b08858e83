//! Git operations and repository management.

pub mod remote;
pub mod repository;
pub mod tags;

pub use remote::RemoteInfo;
pub use repository::GitRepository;
pub use tags::{next_patch, parse_version, TagStore};

/// Number of hex characters to show in abbreviated commit hashes.
pub const SHORT_HASH_LEN: usize = 8;
