//! Google API dispatch module
//!
//! Everything that touches the network lives here: credentials, the HTTP
//! session and the client that ties them together.
//!
//! # Module Structure
//!
//! - [`auth`] - API key, OAuth2 user and Application Default Credentials
//! - [`client`] - Dispatch client and Discovery Service access
//! - [`http`] - [`http::Session`] trait and its reqwest implementation
//!
//! # Example
//!
//! ```ignore
//! use gdiscovery::gcp::client::Client;
//! use gdiscovery::CallArgs;
//!
//! async fn example() -> gdiscovery::Result<()> {
//!     let client = Client::new()?.with_api_key("my-key");
//!     let books = client.discover("books", "v1").await?;
//!     let request = books.build("volumes.list", CallArgs::new().param("q", "rust"))?;
//!     let volumes = client.send(request).await?.content();
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
