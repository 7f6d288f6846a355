//! # Tagwatch Core
//!
//! Core data model for the tagwatch container tag watcher.
//!
//! This crate provides the foundational types shared by the registry client
//! and the watcher engine:
//!
//! - [`RegistryIdentity`] - Structural key for one registry authentication context
//! - [`Subscription`] - Durable interest in a `(registry, repository, tag)` triple
//! - [`DigestRecord`] / [`DigestKey`] - Last observed digest and its storage key
//! - [`ChangeEvent`] - Transient notification emitted on `New` / `Updated`
//!
//! ## Example
//!
//! ```rust
//! use tagwatch_core::{ProviderType, RegistryIdentity, Subscription};
//!
//! let identity = RegistryIdentity::docker_hub();
//! let subscription = Subscription::new(
//!     "sub-1",
//!     identity.clone(),
//!     "library/nginx",
//!     "latest",
//!     "https://hooks.example.com/nginx",
//! );
//!
//! assert_eq!(subscription.identity(), &identity);
//! assert_eq!(subscription.reference(), "library/nginx:latest");
//! assert_eq!(identity.provider, ProviderType::DockerHub);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod identity;
pub mod key;
pub mod record;
pub mod subscription;


// Re-export main types at crate root
pub use error::{Error, Result};
pub use event::{ChangeEvent, ChangeKind};
pub use identity::{ProviderType, RegistryIdentity, DOCKER_HUB_HOST};
pub use key::{decode_segment, encode_segment, DigestKey};
pub use record::{DigestPatch, DigestRecord};
pub use subscription::Subscription;
