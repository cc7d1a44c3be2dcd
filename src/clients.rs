//! Clients for the remote content API.
//!
//! - [`github`]: the [`github::ContentApi`] trait the workflows call through,
//!   its wire types, and the GitHub REST implementation
//! - [`github_http`]: HTTP transport that attaches the credential and maps
//!   non-success responses onto the error taxonomy
//!
//! No workflow logic lives here, and nothing is retried at this layer.

pub mod github;
pub mod github_http;
