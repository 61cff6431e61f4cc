//! 在不消费连接数据的前提下嗅探 TLS ClientHello
//!
//! [`peek`] 从流中读出 ClientHello (SNI、ALPN 等)，返回的 [`PrefixStream`]
//! 会先回放 peek 读过的所有字节，之后的读取者看到的是完整、未被读过的流，
//! 可以直接交给 TLS 或明文处理逻辑。
//!
//! ```
//! use std::io::Read;
//!
//! let data: &[u8] = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
//! let (hello, mut stream) = tls_peek::peek(data).unwrap();
//! assert!(hello.is_none());
//!
//! let mut replay = Vec::new();
//! stream.read_to_end(&mut replay).unwrap();
//! assert_eq!(replay, data);
//! ```

pub mod config;
pub mod error;
pub mod network;
pub mod peek;
pub mod protocol;

pub use config::PeekConfig;
pub use error::{Malformed, PeekError};
pub use network::prefix::PrefixStream;
pub use network::recording::RecordingReader;
pub use peek::{peek, peek_async, PeekResult, Peeker};
pub use protocol::sniffer::{prefix_is_tls, sniff_client_hello, sniff_tls_sni, PREFIX_LEN};
pub use protocol::tls::{ClientHelloMessage, ExtensionType};
