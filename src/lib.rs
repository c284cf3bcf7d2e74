pub mod cache;
pub mod coding;
pub mod config;
pub mod connection;
pub mod error;
pub mod fwdtable;
pub mod message;
pub mod origins;
pub mod relay;
pub mod session;
pub mod setup;
pub mod tls;
pub mod transport;

pub use config::Config;
pub use connection::Connection;
pub use error::ErrorCode;
pub use fwdtable::FwdTable;
pub use relay::Relay;
pub use session::Session;
pub use transport::Transport;
