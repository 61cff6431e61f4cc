use std::io::Read;

use tokio::io::AsyncRead;
use tracing::debug;

use super::client_hello::ClientHelloMessage;
use super::record::{read_record_async_with, read_record_with};
use crate::config::PeekConfig;
use crate::error::PeekError;

pub const HANDSHAKE_HEADER_LEN: usize = 4;
pub const MAX_HANDSHAKE_LEN: usize = 65536;

/// 握手消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeType {
    HelloRequest,
    ClientHello,
    ServerHello,
    Unknown(u8),
}

impl From<u8> for HandshakeType {
    fn from(value: u8) -> Self {
        match value {
            0 => HandshakeType::HelloRequest,
            1 => HandshakeType::ClientHello,
            2 => HandshakeType::ServerHello,
            other => HandshakeType::Unknown(other),
        }
    }
}

impl From<HandshakeType> for u8 {
    fn from(value: HandshakeType) -> Self {
        match value {
            HandshakeType::HelloRequest => 0,
            HandshakeType::ClientHello => 1,
            HandshakeType::ServerHello => 2,
            HandshakeType::Unknown(other) => other,
        }
    }
}

enum Progress {
    NeedMore,
    Complete(Vec<u8>),
    Oversized,
}

/// 把多个记录的 payload 拼成一条完整的握手消息
struct Reassembler<'a> {
    config: &'a PeekConfig,
    data: Vec<u8>,
    records: usize,
}

impl<'a> Reassembler<'a> {
    fn new(config: &'a PeekConfig) -> Self {
        Self {
            config,
            data: Vec::new(),
            records: 0,
        }
    }

    fn push(&mut self, payload: Vec<u8>) -> Progress {
        self.records += 1;
        self.data.extend_from_slice(&payload);
        if self.data.len() < HANDSHAKE_HEADER_LEN {
            return Progress::NeedMore;
        }

        let length = u32::from_be_bytes([0, self.data[1], self.data[2], self.data[3]]) as usize;
        if length > self.config.max_handshake_len {
            debug!(length, "handshake message exceeds limit");
            return Progress::Oversized;
        }

        let total = HANDSHAKE_HEADER_LEN + length;
        if self.data.len() < total {
            return Progress::NeedMore;
        }

        let mut message = std::mem::take(&mut self.data);
        message.truncate(total);
        Progress::Complete(message)
    }

    /// 第一个记录之后遇到的 EOF 都属于 "读到一半"
    fn map_err(&self, err: PeekError) -> PeekError {
        match err {
            PeekError::Closed if self.records > 0 => PeekError::UnexpectedEof,
            other => other,
        }
    }
}

/// 读取一条完整的握手消息 (含 4 字节消息头)
///
/// 任何一个记录不是握手记录、或声明的长度过大，都返回 `Ok(None)`。
pub fn read_handshake<R: Read + ?Sized>(r: &mut R) -> Result<Option<Vec<u8>>, PeekError> {
    read_handshake_with(r, &PeekConfig::default())
}

pub fn read_handshake_with<R: Read + ?Sized>(
    r: &mut R,
    config: &PeekConfig,
) -> Result<Option<Vec<u8>>, PeekError> {
    let mut reassembler = Reassembler::new(config);
    loop {
        let payload = match read_record_with(r, config) {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(None),
            Err(e) => return Err(reassembler.map_err(e)),
        };
        match reassembler.push(payload) {
            Progress::NeedMore => continue,
            Progress::Complete(message) => return Ok(Some(message)),
            Progress::Oversized => return Ok(None),
        }
    }
}

/// [`read_handshake`] 的异步版本
pub async fn read_handshake_async<R: AsyncRead + Unpin + ?Sized>(
    r: &mut R,
) -> Result<Option<Vec<u8>>, PeekError> {
    read_handshake_async_with(r, &PeekConfig::default()).await
}

pub async fn read_handshake_async_with<R: AsyncRead + Unpin + ?Sized>(
    r: &mut R,
    config: &PeekConfig,
) -> Result<Option<Vec<u8>>, PeekError> {
    let mut reassembler = Reassembler::new(config);
    loop {
        let payload = match read_record_async_with(r, config).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(None),
            Err(e) => return Err(reassembler.map_err(e)),
        };
        match reassembler.push(payload) {
            Progress::NeedMore => continue,
            Progress::Complete(message) => return Ok(Some(message)),
            Progress::Oversized => return Ok(None),
        }
    }
}

/// 读取并解析 ClientHello
///
/// 不是 ClientHello 或解析失败都返回 `Ok(None)`，只有 I/O 错误才返回 `Err`。
pub fn read_client_hello<R: Read + ?Sized>(
    r: &mut R,
) -> Result<Option<ClientHelloMessage>, PeekError> {
    read_client_hello_with(r, &PeekConfig::default())
}

pub fn read_client_hello_with<R: Read + ?Sized>(
    r: &mut R,
    config: &PeekConfig,
) -> Result<Option<ClientHelloMessage>, PeekError> {
    Ok(read_handshake_with(r, config)?.and_then(decode_client_hello))
}

/// [`read_client_hello`] 的异步版本
pub async fn read_client_hello_async<R: AsyncRead + Unpin + ?Sized>(
    r: &mut R,
) -> Result<Option<ClientHelloMessage>, PeekError> {
    read_client_hello_async_with(r, &PeekConfig::default()).await
}

pub async fn read_client_hello_async_with<R: AsyncRead + Unpin + ?Sized>(
    r: &mut R,
    config: &PeekConfig,
) -> Result<Option<ClientHelloMessage>, PeekError> {
    Ok(read_handshake_async_with(r, config)
        .await?
        .and_then(decode_client_hello))
}

fn decode_client_hello(message: Vec<u8>) -> Option<ClientHelloMessage> {
    let msg_type = HandshakeType::from(message[0]);
    if msg_type != HandshakeType::ClientHello {
        debug!(?msg_type, "handshake message is not a ClientHello");
        return None;
    }

    match ClientHelloMessage::unmarshal(&message) {
        Ok(hello) => {
            debug!(
                sni = ?hello.server_name,
                alpn = ?hello.alpn_protocols,
                "ClientHello decoded"
            );
            Some(hello)
        }
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}
