use super::tls::handshake::read_client_hello;
use super::tls::record::ContentType;
use super::tls::ClientHelloMessage;

/// 判断连接是否为 TLS 所需的字节数
pub const PREFIX_LEN: usize = 1;

/// 根据连接的第一个字节粗略判断是否为 TLS
///
/// 只看记录类型是否为 Handshake (0x16)，不需要预读更多数据。
pub fn prefix_is_tls(prefix: &[u8]) -> bool {
    prefix
        .first()
        .is_some_and(|&b| ContentType::from(b) == ContentType::Handshake)
}

/// 尝试从已经缓冲的数据中解析 ClientHello
///
/// 数据不完整、不是 TLS、格式错误都返回 `None`。适合已经拿到一段数据包、
/// 不需要把字节还给流的场景。
pub fn sniff_client_hello(data: &[u8]) -> Option<ClientHelloMessage> {
    let mut reader = data;
    read_client_hello(&mut reader).ok().flatten()
}

/// 尝试从数据包中嗅探 TLS SNI (Server Name Indication)
pub fn sniff_tls_sni(data: &[u8]) -> Option<String> {
    sniff_client_hello(data)?.server_name
}
