use std::io::{self, Read};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// 记录所有读到的字节
///
/// 借用底层流，按读取顺序把每次实际交付的数据追加到内部缓冲区。
pub struct RecordingReader<'a, R: ?Sized> {
    inner: &'a mut R,
    received: Vec<u8>,
}

impl<'a, R: ?Sized> RecordingReader<'a, R> {
    pub fn new(inner: &'a mut R) -> Self {
        Self {
            inner,
            received: Vec::new(),
        }
    }

    /// 到目前为止读到的所有字节
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    pub fn into_received(self) -> Vec<u8> {
        self.received
    }
}

impl<R: Read + ?Sized> Read for RecordingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.received.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

impl<R: AsyncRead + Unpin + ?Sized> AsyncRead for RecordingReader<'_, R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let this = &mut *self;
        ready!(Pin::new(&mut *this.inner).poll_read(cx, buf))?;
        this.received.extend_from_slice(&buf.filled()[before..]);
        Poll::Ready(Ok(()))
    }
}
