use std::io::{self, Read, Write};

use bytes::{BufMut, BytesMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tls_peek::protocol::tls::{ContentType, RecordHeader};
use tls_peek::{peek, peek_async, ClientHelloMessage, PeekConfig, PeekError, Peeker};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 每次 read 最多返回 chunks 中的下一个长度
struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunks: Vec<usize>,
    next: usize,
}

impl ChunkedReader {
    fn new(data: Vec<u8>, rng: &mut StdRng) -> Self {
        let chunks = (0..64).map(|_| rng.gen_range(1..=23)).collect();
        Self {
            data,
            pos: 0,
            chunks,
            next: 0,
        }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = self.chunks[self.next % self.chunks.len()];
        self.next += 1;
        let n = limit.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// 双向连接: 读固定数据，写入的内容记下来
struct Duplex {
    input: io::Cursor<Vec<u8>>,
    output: Vec<u8>,
}

impl Read for Duplex {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for Duplex {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn full_hello() -> ClientHelloMessage {
    ClientHelloMessage {
        version: 0x0303,
        random: [0x5a; 32],
        session_id: vec![0xee; 32],
        cipher_suites: vec![0x1301, 0x1302, 0x1303, 0xc02b, 0xc02f, 0x009c],
        compression_methods: vec![0],
        next_protocol_negotiation: true,
        server_name: Some("api.example.com".to_string()),
        supported_points: vec![0],
        ticket_supported: true,
        session_ticket: vec![0x42; 96],
        alpn_protocols: vec!["h2".to_string(), "http/1.1".to_string()],
    }
}

/// 把握手消息切成 records 个记录
fn records(message: &[u8], records: usize) -> Vec<u8> {
    let size = message.len().div_ceil(records);
    let mut buf = BytesMut::new();
    for chunk in message.chunks(size) {
        RecordHeader {
            content_type: ContentType::Handshake,
            version: 0x0301,
            length: chunk.len(),
        }
        .encode(&mut buf);
        buf.put_slice(chunk);
    }
    buf.to_vec()
}

fn read_all<R: Read>(mut r: R) -> Vec<u8> {
    let mut out = Vec::new();
    r.read_to_end(&mut out).unwrap();
    out
}

#[test]
fn test_fragmented_hello_decodes_identically() {
    init_tracing();
    let message = full_hello().marshal();

    for n in [1, 2, 5] {
        let mut data = records(&message, n);
        data.extend_from_slice(b"\x17\x03\x03\x00\x05hello");

        let (hello, stream) = peek(&data[..]).unwrap();
        assert_eq!(hello, Some(full_hello()), "{} records", n);
        assert_eq!(read_all(stream), data);
    }
}

#[test]
fn test_replay_is_transparent_for_random_read_sizes() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x7e5);
    let hello = records(&full_hello().marshal(), 3);

    let inputs: Vec<Vec<u8>> = vec![
        [&hello[..], &b"trailing application bytes"[..]].concat(),
        b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n".to_vec(),
        // 握手消息太短，ClientHello 解析失败
        [&[22u8, 3, 1, 0, 6, 1, 0, 0, 2, 3, 3][..], &b"rest"[..]].concat(),
        // ServerHello
        records(&[2, 0, 0, 2, 3, 3], 1),
        (0..=255u8).cycle().take(4096).collect(),
    ];

    for input in inputs {
        for _ in 0..20 {
            let reader = ChunkedReader::new(input.clone(), &mut rng);
            let (_, stream) = peek(reader).unwrap();
            assert_eq!(read_all(stream), input);
        }
    }
}

#[test]
fn test_truncated_hello_is_end_of_stream() {
    let data = records(&full_hello().marshal(), 2);
    for len in [1, 4, 5, 6, data.len() / 2, data.len() - 1] {
        match peek(&data[..len]) {
            Err(e) => assert!(e.is_eof(), "len {}: {}", len, e),
            Ok(_) => panic!("len {}: expected end of stream", len),
        }
    }
}

/// 不停发送空握手记录，超过 limit 字节后报错
struct EmptyRecordFlood {
    served: usize,
    limit: usize,
}

impl Read for EmptyRecordFlood {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.served >= self.limit {
            return Err(io::ErrorKind::ConnectionReset.into());
        }
        let n = buf.len().min(self.limit - self.served);
        for b in &mut buf[..n] {
            *b = [22u8, 3, 1, 0, 0][self.served % 5];
            self.served += 1;
        }
        Ok(n)
    }
}

#[test]
fn test_empty_record_flood_is_not_tls() {
    let flood = EmptyRecordFlood {
        served: 0,
        limit: 50_000_000,
    };
    let (hello, stream) = peek(flood).unwrap();
    assert!(hello.is_none());
    assert_eq!(stream.prefix(), [22, 3, 1, 0, 0]);
    assert_eq!(stream.get_ref().served, 5);
}

#[tokio::test]
async fn test_empty_record_flood_is_not_tls_async() {
    let mock = tokio_test::io::Builder::new()
        .read(&[22, 3, 1, 0, 0])
        .build();
    let (hello, stream) = peek_async(mock).await.unwrap();
    assert!(hello.is_none());
    assert_eq!(stream.prefix(), [22, 3, 1, 0, 0]);
}

#[test]
fn test_replay_stream_stays_writable() {
    let data = records(&full_hello().marshal(), 1);
    let conn = Duplex {
        input: io::Cursor::new(data.clone()),
        output: Vec::new(),
    };

    let (hello, mut stream) = peek(conn).unwrap();
    assert_eq!(
        hello.as_ref().and_then(|h| h.server_name()),
        Some("api.example.com")
    );

    stream.write_all(b"\x15\x03\x03\x00\x02\x02\x28").unwrap();
    assert_eq!(stream.get_ref().output, b"\x15\x03\x03\x00\x02\x02\x28");
    assert_eq!(read_all(&mut stream), data);
}

#[test]
fn test_peeker_from_config_file() {
    let path = std::env::temp_dir().join(format!("tls-peek-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "max_record_len": 64 }"#).unwrap();
    let config = PeekConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let peeker = Peeker::new(config);
    assert_eq!(peeker.config().max_record_len, 64);

    // 整条 ClientHello 放在一个记录里超过了 64 字节
    let data = records(&full_hello().marshal(), 1);
    let (hello, stream) = peeker.peek(&data[..]).unwrap();
    assert!(hello.is_none());
    assert_eq!(read_all(stream), data);
}

#[tokio::test]
async fn test_peek_async_over_mock_stream() {
    use tokio::io::AsyncReadExt;

    init_tracing();
    let data = records(&full_hello().marshal(), 5);

    let mut builder = tokio_test::io::Builder::new();
    for chunk in data.chunks(11) {
        builder.read(chunk);
    }
    let mock = builder.read(b"after").build();

    let (hello, mut stream) = peek_async(mock).await.unwrap();
    assert_eq!(hello, Some(full_hello()));

    let mut out = Vec::new();
    AsyncReadExt::read_to_end(&mut stream, &mut out).await.unwrap();
    assert_eq!(out, [&data[..], &b"after"[..]].concat());
}

#[tokio::test]
async fn test_peek_async_io_error() {
    let mock = tokio_test::io::Builder::new()
        .read(&[22, 3, 1, 0])
        .read_error(io::Error::new(io::ErrorKind::TimedOut, "read deadline"))
        .build();

    match peek_async(mock).await {
        Err(PeekError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("expected I/O error"),
    }
}

#[tokio::test]
async fn test_peek_async_closed_before_data() {
    let mock = tokio_test::io::Builder::new().build();
    assert!(matches!(peek_async(mock).await, Err(PeekError::Closed)));
}
