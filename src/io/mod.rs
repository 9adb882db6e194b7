//! Network collaborators.
//!
//! The fetch pipeline talks to the network only through two traits, so tests
//! can substitute scripted doubles:
//!
//! - [`HttpClient`]: issues one GET and returns status and body
//! - [`ProxyPool`]: hands out a proxy for the next request, or none

mod client;
mod proxy;

pub use client::{
    HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_USER_AGENT,
};
pub use proxy::{HttpProxyPool, ProxyPool, StaticProxyPool};
