use std::io;

use thiserror::Error;

/// Peek 过程中的 I/O 错误
///
/// 格式不对的数据 (非 TLS、非 ClientHello、长度字段越界) 不属于错误，
/// 只会让 peek 返回 `None`。这里只有流本身出问题的情况。
#[derive(Debug, Error)]
pub enum PeekError {
    /// 还没读到任何字节连接就关闭了
    #[error("connection closed before any data was received")]
    Closed,

    /// TLS 记录读到一半时连接关闭
    #[error("connection closed in the middle of a TLS record")]
    UnexpectedEof,

    /// 底层流返回的其他错误 (reset、broken pipe、读超时...)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PeekError {
    /// 是否为流结束 (无论是否读到过数据)
    pub fn is_eof(&self) -> bool {
        matches!(self, PeekError::Closed | PeekError::UnexpectedEof)
    }
}

impl From<PeekError> for io::Error {
    fn from(err: PeekError) -> Self {
        match err {
            PeekError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::UnexpectedEof, other),
        }
    }
}

/// ClientHello 结构不合法
///
/// 附带的字符串只用于日志，说明是哪个字段出了问题。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("malformed ClientHello: {0}")]
pub struct Malformed(pub &'static str);
