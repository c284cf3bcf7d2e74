mod decode;
mod encode;
mod params;
mod string;
mod varint;

pub use decode::*;
pub use encode::*;
pub use params::*;
pub use string::*;
pub use varint::*;

// Shorthand for the tokio traits as we use them everywhere.
pub trait AsyncRead: tokio::io::AsyncRead + Unpin + Send {}
impl<T: tokio::io::AsyncRead + Unpin + Send> AsyncRead for T {}

pub trait AsyncWrite: tokio::io::AsyncWrite + Unpin + Send {}
impl<T: tokio::io::AsyncWrite + Unpin + Send> AsyncWrite for T {}
