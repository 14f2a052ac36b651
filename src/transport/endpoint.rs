//! Controller endpoint addressing and connection.
//!
//! - `host:port`: TCP connection (e.g. a virtual controller)
//! - anything else: Unix Domain Socket path (Unix only)
//!
//! # Example
//!
//! ```ignore
//! use hci_bridge::transport::ControllerEndpoint;
//!
//! let endpoint: ControllerEndpoint = "/tmp/hci.sock".parse()?;
//! let (reader, writer) = endpoint.connect().await?;
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{BridgeError, Result};

/// Read half of a controller connection.
pub type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;

/// Write half of a controller connection.
pub type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Where the controller can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEndpoint {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl ControllerEndpoint {
    /// Connect and split the stream into read and write halves.
    pub async fn connect(&self) -> Result<(BoxedReader, BoxedWriter)> {
        match self {
            ControllerEndpoint::Tcp(addr) => {
                let stream = tokio::net::TcpStream::connect(addr).await?;
                stream.set_nodelay(true)?;
                let (reader, writer) = stream.into_split();
                Ok((Box::new(reader), Box::new(writer)))
            }
            #[cfg(unix)]
            ControllerEndpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                let (reader, writer) = stream.into_split();
                Ok((Box::new(reader), Box::new(writer)))
            }
            #[cfg(not(unix))]
            ControllerEndpoint::Unix(_) => Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "Unix sockets are not available on this platform",
            ))),
        }
    }
}

impl FromStr for ControllerEndpoint {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BridgeError::Config("empty controller endpoint".to_string()));
        }

        match s.parse::<SocketAddr>() {
            Ok(addr) => Ok(ControllerEndpoint::Tcp(addr)),
            Err(_) => Ok(ControllerEndpoint::Unix(PathBuf::from(s))),
        }
    }
}

impl fmt::Display for ControllerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerEndpoint::Tcp(addr) => write!(f, "tcp:{}", addr),
            ControllerEndpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}
