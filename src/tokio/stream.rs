use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(feature = "tokio-tls")]
use tokio_native_tls::TlsStream;

/// The async transport: TCP, TCP+TLS, or a Unix domain socket.
pub enum Stream {
    Tcp(BufReader<TcpStream>),
    #[cfg(feature = "tokio-tls")]
    Tls(BufReader<TlsStream<TcpStream>>),
    #[cfg(unix)]
    Unix(BufReader<UnixStream>),
}

impl Stream {
    pub fn tcp(stream: TcpStream) -> Self {
        Self::Tcp(BufReader::new(stream))
    }

    #[cfg(unix)]
    pub fn unix(stream: UnixStream) -> Self {
        Self::Unix(BufReader::new(stream))
    }

    /// Run the TLS handshake on top of the TCP transport.
    #[cfg(feature = "tokio-tls")]
    pub async fn upgrade_to_tls(self, host: &str) -> std::io::Result<Self> {
        let tcp = match self {
            Self::Tcp(buf_reader) => buf_reader.into_inner(),
            Self::Tls(_) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "Already using TLS",
                ));
            }
            #[cfg(unix)]
            Self::Unix(_) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "TLS not supported for Unix sockets",
                ));
            }
        };

        let connector = native_tls::TlsConnector::new().map_err(std::io::Error::other)?;
        let connector = tokio_native_tls::TlsConnector::from(connector);
        let tls_stream = connector
            .connect(host, tcp)
            .await
            .map_err(std::io::Error::other)?;

        Ok(Self::Tls(BufReader::new(tls_stream)))
    }

    pub async fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        match self {
            Self::Tcp(r) => r.read_exact(buf).await.map(|_| ()),
            #[cfg(feature = "tokio-tls")]
            Self::Tls(r) => r.read_exact(buf).await.map(|_| ()),
            #[cfg(unix)]
            Self::Unix(r) => r.read_exact(buf).await.map(|_| ()),
        }
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Self::Tcp(r) => r.write_all(buf).await,
            #[cfg(feature = "tokio-tls")]
            Self::Tls(r) => r.write_all(buf).await,
            #[cfg(unix)]
            Self::Unix(r) => r.write_all(buf).await,
        }
    }

    pub async fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Tcp(r) => r.flush().await,
            #[cfg(feature = "tokio-tls")]
            Self::Tls(r) => r.flush().await,
            #[cfg(unix)]
            Self::Unix(r) => r.flush().await,
        }
    }

    /// Shut down the write side. Errors are ignored; the peer may already be
    /// gone.
    pub async fn close(&mut self) {
        match self {
            Self::Tcp(r) => {
                let _ = r.shutdown().await;
            }
            #[cfg(feature = "tokio-tls")]
            Self::Tls(r) => {
                let _ = r.shutdown().await;
            }
            #[cfg(unix)]
            Self::Unix(r) => {
                let _ = r.shutdown().await;
            }
        }
    }
}
