use std::io::Read;

use tokio::io::AsyncRead;
use tracing::trace;

use crate::config::PeekConfig;
use crate::error::PeekError;
use crate::network::prefix::PrefixStream;
use crate::network::recording::RecordingReader;
use crate::protocol::tls::handshake::{read_client_hello_async_with, read_client_hello_with};
use crate::protocol::tls::ClientHelloMessage;

/// peek 的结果: 解析出的 ClientHello (可能没有) 和回放流
pub type PeekResult<S> = Result<(Option<ClientHelloMessage>, PrefixStream<S>), PeekError>;

/// 读取 TLS ClientHello，并把读过的字节放回流的前面
///
/// 没有检测到 ClientHello (明文、其他协议、格式错误) 时返回 `None`，这不是错误。
/// 只有 I/O 错误 (包括数据不足时的 EOF) 才返回 `Err`，此时不再返回流。
pub fn peek<S: Read>(stream: S) -> PeekResult<S> {
    Peeker::default().peek(stream)
}

/// [`peek`] 的异步版本
pub async fn peek_async<S: AsyncRead + Unpin>(stream: S) -> PeekResult<S> {
    Peeker::default().peek_async(stream).await
}

/// 带自定义读取上限的 peek
#[derive(Debug, Clone, Default)]
pub struct Peeker {
    config: PeekConfig,
}

impl Peeker {
    pub fn new(config: PeekConfig) -> Self {
        Self {
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &PeekConfig {
        &self.config
    }

    pub fn peek<S: Read>(&self, mut stream: S) -> PeekResult<S> {
        let mut recorder = RecordingReader::new(&mut stream);
        let hello = read_client_hello_with(&mut recorder, &self.config)?;
        let received = recorder.into_received();
        trace!(
            recorded = received.len(),
            client_hello = hello.is_some(),
            "peek finished"
        );
        Ok((hello, PrefixStream::new(received, stream)))
    }

    pub async fn peek_async<S: AsyncRead + Unpin>(&self, mut stream: S) -> PeekResult<S> {
        let mut recorder = RecordingReader::new(&mut stream);
        let hello = read_client_hello_async_with(&mut recorder, &self.config).await?;
        let received = recorder.into_received();
        trace!(
            recorded = received.len(),
            client_hello = hello.is_some(),
            "peek finished"
        );
        Ok((hello, PrefixStream::new(received, stream)))
    }
}
