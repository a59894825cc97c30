//! Tracker surfaces.
//!
//! The offline surface is a line protocol parsed by [`parser`]. The
//! synchronized surface is a small HTTP contract: [`server`] routes
//! [`http`] requests carrying [`request`] bodies and answers with
//! [`render`] fragments, and [`client`] drives it through a [`Transport`].

pub mod client;
pub mod http;
pub mod parser;
pub mod render;
pub mod request;
pub mod server;

pub use client::{
    ClientError, HttpReorderSink, LoopbackTransport, RemoteRoster, RowForm, SaveError, Transport,
    TransportError,
};
pub use http::{ContentType, HttpRequest, HttpResponse, Method};
pub use parser::{parse_command, Command};
pub use request::RequestError;
pub use server::{Server, ServerError};
