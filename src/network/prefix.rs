use std::io::{self, Read, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// 先读 prefix，再读底层流
///
/// peek 消费掉的字节放在 prefix 里原样回放，读取方看到的字节序列与
/// 从未被 peek 过的流完全一致。写操作直接转发给底层流。
#[derive(Debug)]
pub struct PrefixStream<S> {
    prefix: Bytes,
    inner: S,
}

impl<S> PrefixStream<S> {
    pub fn new(prefix: impl Into<Bytes>, inner: S) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }

    /// 尚未回放的字节
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// 直接读底层流会跳过尚未回放的 prefix
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// 拆出剩余的 prefix 和底层流
    pub fn into_inner(self) -> (Bytes, S) {
        (self.prefix, self.inner)
    }

    /// 从 prefix 中拷贝最多 dst.len() 个字节
    fn drain_prefix(&mut self, dst: &mut [u8]) -> usize {
        let n = self.prefix.len().min(dst.len());
        dst[..n].copy_from_slice(&self.prefix[..n]);
        self.prefix.advance(n);
        n
    }
}

impl<S: Read> Read for PrefixStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.prefix.is_empty() {
            return Ok(self.drain_prefix(buf));
        }
        self.inner.read(buf)
    }
}

impl<S: Write> Write for PrefixStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for PrefixStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.prefix.is_empty() {
            let n = self.prefix.len().min(buf.remaining());
            buf.put_slice(&self.prefix[..n]);
            self.prefix.advance(n);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for PrefixStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
