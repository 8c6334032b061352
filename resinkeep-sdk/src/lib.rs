//! Wire types shared by the resinkeep server and its clients.
//!
//! The [`objects`] module holds every request body, response snapshot,
//! query-string DTO and WebSocket frame the HTTP API speaks. The typed
//! HTTP/WebSocket client lives in [`client`] behind the `client` feature.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
