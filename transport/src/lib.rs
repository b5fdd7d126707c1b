use thiserror::Error;

mod client;

pub use client::PointerClient;

pub mod proto {
    tonic::include_proto!("pointer");
}

pub use proto::{CursorOp, FrameBundle, PublishAck, cursor_op::Kind};

pub type Result<T> = core::result::Result<T, Error>;

/// Pointer-protocol transport error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid pointer endpoint {0}")]
    Endpoint(String),
    #[error("could not connect to pointer endpoint")]
    Connect(#[source] tonic::transport::Error),
    #[error("frame bundle was not published")]
    Publish(#[from] tonic::Status),
    #[error("transport runtime could not be started")]
    Runtime(#[from] std::io::Error),
}
