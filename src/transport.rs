use std::io;

use async_trait::async_trait;

/// The surface the relay needs from a WebTransport session.
///
/// The protocol core is written against this seam so the QUIC plumbing stays
/// swappable; tests drive it with an in-memory implementation.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
	type SendStream: tokio::io::AsyncWrite + Unpin + Send + 'static;
	type RecvStream: tokio::io::AsyncRead + Unpin + Send + 'static;

	/// Wait for the peer to open a bidirectional stream.
	async fn accept_bi(&self) -> io::Result<(Self::SendStream, Self::RecvStream)>;

	/// Open a bidirectional stream towards the peer.
	async fn open_bi(&self) -> io::Result<(Self::SendStream, Self::RecvStream)>;

	/// Wait for the peer to open a unidirectional stream.
	async fn accept_uni(&self) -> io::Result<Self::RecvStream>;

	/// Open a unidirectional stream towards the peer.
	async fn open_uni(&self) -> io::Result<Self::SendStream>;

	/// Close the session with an application error code and reason.
	fn close(&self, code: u32, reason: &str);
}

fn into_io<E: std::error::Error + Send + Sync + 'static>(err: E) -> io::Error {
	io::Error::new(io::ErrorKind::Other, err)
}

#[async_trait]
impl Transport for webtransport_quinn::Session {
	type SendStream = webtransport_quinn::SendStream;
	type RecvStream = webtransport_quinn::RecvStream;

	async fn accept_bi(&self) -> io::Result<(Self::SendStream, Self::RecvStream)> {
		webtransport_quinn::Session::accept_bi(self).await.map_err(into_io)
	}

	async fn open_bi(&self) -> io::Result<(Self::SendStream, Self::RecvStream)> {
		webtransport_quinn::Session::open_bi(self).await.map_err(into_io)
	}

	async fn accept_uni(&self) -> io::Result<Self::RecvStream> {
		webtransport_quinn::Session::accept_uni(self).await.map_err(into_io)
	}

	async fn open_uni(&self) -> io::Result<Self::SendStream> {
		webtransport_quinn::Session::open_uni(self).await.map_err(into_io)
	}

	fn close(&self, code: u32, reason: &str) {
		webtransport_quinn::Session::close(self, code, reason.as_bytes());
	}
}
