use std::io::{self, Read};

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use crate::config::PeekConfig;
use crate::error::PeekError;

pub const RECORD_HEADER_LEN: usize = 5;
/// 2^14 明文 + 2048 字节的加密开销
pub const MAX_CIPHERTEXT_LEN: usize = 16384 + 2048;
pub const MAX_RECORD_VERSION: u16 = 0x1000;

/// TLS 记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    ChangeCipherSpec,
    Alert,
    Handshake,
    ApplicationData,
    Unknown(u8),
}

impl From<u8> for ContentType {
    fn from(value: u8) -> Self {
        match value {
            20 => ContentType::ChangeCipherSpec,
            21 => ContentType::Alert,
            22 => ContentType::Handshake,
            23 => ContentType::ApplicationData,
            other => ContentType::Unknown(other),
        }
    }
}

impl From<ContentType> for u8 {
    fn from(value: ContentType) -> Self {
        match value {
            ContentType::ChangeCipherSpec => 20,
            ContentType::Alert => 21,
            ContentType::Handshake => 22,
            ContentType::ApplicationData => 23,
            ContentType::Unknown(other) => other,
        }
    }
}

/// 5 字节的记录头: type(1) + version(2) + length(2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub content_type: ContentType,
    pub version: u16,
    pub length: usize,
}

impl RecordHeader {
    pub fn parse(header: &[u8; RECORD_HEADER_LEN]) -> Self {
        Self {
            content_type: ContentType::from(header[0]),
            version: u16::from_be_bytes([header[1], header[2]]),
            length: u16::from_be_bytes([header[3], header[4]]) as usize,
        }
    }

    /// # Panics
    ///
    /// `length` 超过 65535 时 panic。
    pub fn encode(&self, buf: &mut BytesMut) {
        assert!(
            self.length <= u16::MAX as usize,
            "record length {} does not fit in 16 bits",
            self.length
        );
        buf.put_u8(self.content_type.into());
        buf.put_u16(self.version);
        buf.put_u16(self.length as u16);
    }

    /// 这个记录头是否像是握手记录
    ///
    /// 类型不对或长度/版本离谱都只说明 "不是 TLS"，不算错误。
    /// 握手记录不允许空 payload (RFC 8446 5.1)，否则重组永远没有进展。
    fn is_handshake(&self, config: &PeekConfig) -> bool {
        if self.content_type != ContentType::Handshake {
            trace!(content_type = ?self.content_type, "not a handshake record");
            return false;
        }
        if self.length == 0 {
            debug!("empty handshake record");
            return false;
        }
        if self.length > config.max_record_len {
            debug!(length = self.length, "record length exceeds limit");
            return false;
        }
        if self.version >= config.max_record_version {
            debug!(version = self.version, "record version out of range");
            return false;
        }
        true
    }
}

/// 读取一个 TLS 握手记录的 payload
///
/// - `Ok(Some(payload))`: 握手记录
/// - `Ok(None)`: 不是 TLS 握手记录，payload 不会被读取
/// - `Err(PeekError::Closed)`: 一个字节都没读到流就结束了
/// - `Err(PeekError::UnexpectedEof)`: 记录读到一半流结束
pub fn read_record<R: Read + ?Sized>(r: &mut R) -> Result<Option<Vec<u8>>, PeekError> {
    read_record_with(r, &PeekConfig::default())
}

pub fn read_record_with<R: Read + ?Sized>(
    r: &mut R,
    config: &PeekConfig,
) -> Result<Option<Vec<u8>>, PeekError> {
    let mut header = [0u8; RECORD_HEADER_LEN];
    let n = read_full(r, &mut header)?;
    if n < RECORD_HEADER_LEN {
        return Err(header_eof(n));
    }

    let header = RecordHeader::parse(&header);
    if !header.is_handshake(config) {
        return Ok(None);
    }

    let mut payload = vec![0u8; header.length];
    if read_full(r, &mut payload)? < header.length {
        return Err(PeekError::UnexpectedEof);
    }
    Ok(Some(payload))
}

/// [`read_record`] 的异步版本
pub async fn read_record_async<R: AsyncRead + Unpin + ?Sized>(
    r: &mut R,
) -> Result<Option<Vec<u8>>, PeekError> {
    read_record_async_with(r, &PeekConfig::default()).await
}

pub async fn read_record_async_with<R: AsyncRead + Unpin + ?Sized>(
    r: &mut R,
    config: &PeekConfig,
) -> Result<Option<Vec<u8>>, PeekError> {
    let mut header = [0u8; RECORD_HEADER_LEN];
    let n = read_full_async(r, &mut header).await?;
    if n < RECORD_HEADER_LEN {
        return Err(header_eof(n));
    }

    let header = RecordHeader::parse(&header);
    if !header.is_handshake(config) {
        return Ok(None);
    }

    let mut payload = vec![0u8; header.length];
    if read_full_async(r, &mut payload).await? < header.length {
        return Err(PeekError::UnexpectedEof);
    }
    Ok(Some(payload))
}

fn header_eof(read: usize) -> PeekError {
    if read == 0 {
        PeekError::Closed
    } else {
        PeekError::UnexpectedEof
    }
}

/// 尽量填满 buf，返回实际读到的字节数 (小于 buf.len() 说明遇到 EOF)
fn read_full<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

async fn read_full_async<R: AsyncRead + Unpin + ?Sized>(
    r: &mut R,
    buf: &mut [u8],
) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
