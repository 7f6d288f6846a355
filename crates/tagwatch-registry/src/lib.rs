//! # Tagwatch Registry
//!
//! Container registry clients that resolve `repository:tag` to the content
//! digest it currently points at.
//!
//! ## Features
//!
//! - **Provider variants**: Docker Hub and Azure Container Registry behind
//!   one `resolve_digest` capability
//! - **Grouped tokens**: one bearer token per client, scoped to every
//!   repository of its registry group
//! - **Single-flight acquisition**: concurrent resolutions share a single
//!   in-flight token request via [`CredentialCache`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tagwatch_core::RegistryIdentity;
//! use tagwatch_registry::{RegistryClientFactory, RegistryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let factory = RegistryClientFactory::new(RegistryConfig::new())?;
//!
//!     let client = factory.create(&RegistryIdentity::docker_hub(), ["library/nginx"])?;
//!     let digest = client.resolve_digest("library/nginx", "latest").await?;
//!     println!("{digest}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 RegistryClientFactory                    │
//! │        (RegistryConfig + shared reqwest::Client)         │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │ one per registry group
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                     RegistryClient                       │
//! │  ┌──────────────────┐  ┌──────────────────────────────┐  │
//! │  │ DockerHub / Acr  │  │ CredentialCache (one token)  │  │
//! │  │ (token flow)     │  │                              │  │
//! │  └──────────────────┘  └──────────────────────────────┘  │
//! └────────────────────────────┬─────────────────────────────┘
//!                              ▼
//!              GET /v2/<repo>/manifests/<tag>
//!              → Docker-Content-Digest
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod acr;
mod client;
mod config;
mod credential;
mod docker_hub;
mod error;
mod factory;

pub use acr::AcrClient;
pub use client::{DigestResolver, RegistryClient, DIGEST_HEADER, MANIFEST_V2};
pub use config::{DockerHubCredentials, RegistryConfig};
pub use credential::CredentialCache;
pub use docker_hub::DockerHubClient;
pub use error::{AuthError, RegistryError};
pub use factory::RegistryClientFactory;
