use bytes::{Buf, BufMut, BytesMut};
use serde::{Serialize, Serializer};

use super::extension::ExtensionType;
use super::handshake::{HandshakeType, HANDSHAKE_HEADER_LEN};
use crate::error::Malformed;

/// 消息头(4) + version(2) + random(32) + 三个长度前缀(1 + 2 + 1)
pub const MIN_CLIENT_HELLO_LEN: usize = 42;
pub const RANDOM_LEN: usize = 32;
pub const MAX_SESSION_ID_LEN: usize = 32;

/// 解析后的 TLS ClientHello
///
/// 所有字段都是拷贝出来的，不引用输入缓冲区。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientHelloMessage {
    pub version: u16,
    #[serde(serialize_with = "as_hex")]
    pub random: [u8; RANDOM_LEN],
    #[serde(serialize_with = "as_hex")]
    pub session_id: Vec<u8>,
    /// 保持客户端的优先顺序
    pub cipher_suites: Vec<u16>,
    pub compression_methods: Vec<u8>,
    pub next_protocol_negotiation: bool,
    pub server_name: Option<String>,
    pub supported_points: Vec<u8>,
    pub ticket_supported: bool,
    #[serde(serialize_with = "as_hex")]
    pub session_ticket: Vec<u8>,
    pub alpn_protocols: Vec<String>,
}

fn as_hex<T: AsRef<[u8]>, S: Serializer>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// 从 buf 头部切出 n 个字节
fn take<'a>(buf: &mut &'a [u8], n: usize, field: &'static str) -> Result<&'a [u8], Malformed> {
    if buf.len() < n {
        return Err(Malformed(field));
    }
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

fn utf8(bytes: &[u8], field: &'static str) -> Result<String, Malformed> {
    String::from_utf8(bytes.to_vec()).map_err(|_| Malformed(field))
}

impl ClientHelloMessage {
    /// 解析一条完整的 ClientHello 握手消息 (含 4 字节消息头)
    ///
    /// 调用方负责确认消息类型是 ClientHello，这里只看第 4 字节之后的内容。
    pub fn unmarshal(data: &[u8]) -> Result<Self, Malformed> {
        if data.len() < MIN_CLIENT_HELLO_LEN {
            return Err(Malformed("message too short"));
        }

        let mut buf = &data[HANDSHAKE_HEADER_LEN..];
        let mut hello = Self {
            version: buf.get_u16(),
            ..Default::default()
        };
        buf.copy_to_slice(&mut hello.random);

        let session_id_len = buf.get_u8() as usize;
        if session_id_len > MAX_SESSION_ID_LEN {
            return Err(Malformed("session id too long"));
        }
        hello.session_id = take(&mut buf, session_id_len, "session id")?.to_vec();

        if buf.remaining() < 2 {
            return Err(Malformed("cipher suites length"));
        }
        let cipher_suites_len = buf.get_u16() as usize;
        if cipher_suites_len % 2 == 1 {
            return Err(Malformed("odd cipher suites length"));
        }
        hello.cipher_suites = take(&mut buf, cipher_suites_len, "cipher suites")?
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();

        if buf.remaining() < 1 {
            return Err(Malformed("compression methods length"));
        }
        let compression_len = buf.get_u8() as usize;
        hello.compression_methods = take(&mut buf, compression_len, "compression methods")?.to_vec();

        // 扩展是可选的
        if buf.is_empty() {
            return Ok(hello);
        }
        if buf.remaining() < 2 {
            return Err(Malformed("extensions length"));
        }
        let extensions_len = buf.get_u16() as usize;
        if extensions_len != buf.remaining() {
            return Err(Malformed("extensions length mismatch"));
        }

        while buf.has_remaining() {
            if buf.remaining() < 4 {
                return Err(Malformed("extension header"));
            }
            let ext_type = ExtensionType::from(buf.get_u16());
            let ext_len = buf.get_u16() as usize;
            let body = take(&mut buf, ext_len, "extension body")?;
            hello.apply_extension(ext_type, body)?;
        }

        Ok(hello)
    }

    fn apply_extension(&mut self, ext_type: ExtensionType, mut body: &[u8]) -> Result<(), Malformed> {
        match ext_type {
            ExtensionType::ServerName => {
                if body.remaining() < 2 {
                    return Err(Malformed("server name list"));
                }
                let num_names = body.get_u16();
                for _ in 0..num_names {
                    if body.remaining() < 3 {
                        return Err(Malformed("server name entry"));
                    }
                    let name_type = body.get_u8();
                    let name_len = body.get_u16() as usize;
                    let name = take(&mut body, name_len, "server name")?;
                    // host_name(0)，只取第一个
                    if name_type == 0 {
                        if !name.is_empty() {
                            self.server_name = Some(utf8(name, "server name encoding")?);
                        }
                        break;
                    }
                }
            }
            ExtensionType::NextProtocolNegotiation => {
                if !body.is_empty() {
                    return Err(Malformed("next protocol negotiation body"));
                }
                self.next_protocol_negotiation = true;
            }
            ExtensionType::SupportedPointFormats => {
                if body.remaining() < 1 {
                    return Err(Malformed("supported point formats"));
                }
                let count = body.get_u8() as usize;
                if body.remaining() != count {
                    return Err(Malformed("supported point formats length"));
                }
                self.supported_points = body.to_vec();
            }
            ExtensionType::SessionTicket => {
                self.ticket_supported = true;
                self.session_ticket = body.to_vec();
            }
            ExtensionType::Alpn => {
                if body.remaining() < 2 {
                    return Err(Malformed("alpn list"));
                }
                let list_len = body.get_u16() as usize;
                if list_len != body.remaining() {
                    return Err(Malformed("alpn list length"));
                }
                while body.has_remaining() {
                    let name_len = body.get_u8() as usize;
                    // 协议名不允许为空 (RFC 7301 section 3.1)
                    if name_len == 0 {
                        return Err(Malformed("empty alpn protocol"));
                    }
                    let name = take(&mut body, name_len, "alpn protocol")?;
                    self.alpn_protocols.push(utf8(name, "alpn protocol encoding")?);
                }
            }
            ExtensionType::Unknown(_) => {}
        }
        Ok(())
    }

    /// 编码为握手消息 (含 4 字节消息头)
    ///
    /// # Panics
    ///
    /// session id 超过 32 字节、ALPN 协议名为空或超过 255 字节，
    /// 或任何字段放不进它的长度前缀时 panic。
    pub fn marshal(&self) -> Vec<u8> {
        assert!(
            self.session_id.len() <= MAX_SESSION_ID_LEN,
            "session id longer than {} bytes",
            MAX_SESSION_ID_LEN
        );

        let mut body = BytesMut::with_capacity(MIN_CLIENT_HELLO_LEN + self.session_id.len());
        body.put_u16(self.version);
        body.put_slice(&self.random);
        body.put_u8(self.session_id.len() as u8);
        body.put_slice(&self.session_id);

        body.put_u16(len_u16(self.cipher_suites.len() * 2, "cipher suites"));
        for suite in &self.cipher_suites {
            body.put_u16(*suite);
        }

        body.put_u8(len_u8(self.compression_methods.len(), "compression methods"));
        body.put_slice(&self.compression_methods);

        if self.has_extensions() {
            let extensions = self.marshal_extensions();
            body.put_u16(len_u16(extensions.len(), "extensions"));
            body.put_slice(&extensions);
        }

        let mut msg = BytesMut::with_capacity(HANDSHAKE_HEADER_LEN + body.len());
        msg.put_u8(HandshakeType::ClientHello.into());
        msg.put_slice(&(body.len() as u32).to_be_bytes()[1..4]);
        msg.put_slice(&body);
        msg.to_vec()
    }

    /// 扩展顺序固定: NPN, SNI, point formats, session ticket, ALPN
    fn marshal_extensions(&self) -> BytesMut {
        let mut ext = BytesMut::new();

        if self.next_protocol_negotiation {
            put_extension(&mut ext, ExtensionType::NextProtocolNegotiation, &[]);
        }

        if let Some(name) = self.server_name.as_deref().filter(|n| !n.is_empty()) {
            let mut sni = BytesMut::with_capacity(5 + name.len());
            // 与解析端一致: 这两个字节按条目数读取，第一个 host_name 就会命中
            sni.put_u16(len_u16(name.len() + 3, "server name"));
            sni.put_u8(0);
            sni.put_u16(name.len() as u16);
            sni.put_slice(name.as_bytes());
            put_extension(&mut ext, ExtensionType::ServerName, &sni);
        }

        if !self.supported_points.is_empty() {
            let mut points = BytesMut::with_capacity(1 + self.supported_points.len());
            points.put_u8(len_u8(self.supported_points.len(), "supported points"));
            points.put_slice(&self.supported_points);
            put_extension(&mut ext, ExtensionType::SupportedPointFormats, &points);
        }

        if self.ticket_supported {
            put_extension(&mut ext, ExtensionType::SessionTicket, &self.session_ticket);
        }

        if !self.alpn_protocols.is_empty() {
            let mut list = BytesMut::new();
            for proto in &self.alpn_protocols {
                assert!(
                    !proto.is_empty() && proto.len() <= 255,
                    "invalid ALPN protocol name: {:?}",
                    proto
                );
                list.put_u8(proto.len() as u8);
                list.put_slice(proto.as_bytes());
            }
            let mut alpn = BytesMut::with_capacity(2 + list.len());
            alpn.put_u16(len_u16(list.len(), "ALPN protocol list"));
            alpn.put_slice(&list);
            put_extension(&mut ext, ExtensionType::Alpn, &alpn);
        }

        ext
    }

    /// 编码时是否会输出扩展块
    pub fn has_extensions(&self) -> bool {
        self.next_protocol_negotiation
            || self.server_name.as_deref().is_some_and(|n| !n.is_empty())
            || !self.supported_points.is_empty()
            || self.ticket_supported
            || !self.alpn_protocols.is_empty()
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn alpn_protocols(&self) -> &[String] {
        &self.alpn_protocols
    }
}

fn put_extension(buf: &mut BytesMut, ext_type: ExtensionType, body: &[u8]) {
    buf.put_u16(ext_type.into());
    buf.put_u16(len_u16(body.len(), "extension body"));
    buf.put_slice(body);
}

fn len_u8(len: usize, field: &str) -> u8 {
    assert!(len <= u8::MAX as usize, "{} too long: {} bytes", field, len);
    len as u8
}

fn len_u16(len: usize, field: &str) -> u16 {
    assert!(len <= u16::MAX as usize, "{} too long: {} bytes", field, len);
    len as u16
}
