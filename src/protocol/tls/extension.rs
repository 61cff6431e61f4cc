/// ClientHello 中能识别的扩展类型
///
/// 其余类型一律归为 `Unknown`，解析时直接跳过。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionType {
    /// RFC 6066
    ServerName,
    /// RFC 4492 section 5.5.2
    SupportedPointFormats,
    /// RFC 7301
    Alpn,
    /// RFC 5077 section 3.2
    SessionTicket,
    /// draft-agl-tls-nextprotoneg, 没有正式分配的编号
    NextProtocolNegotiation,
    Unknown(u16),
}

impl From<u16> for ExtensionType {
    fn from(value: u16) -> Self {
        match value {
            0 => ExtensionType::ServerName,
            11 => ExtensionType::SupportedPointFormats,
            16 => ExtensionType::Alpn,
            35 => ExtensionType::SessionTicket,
            13172 => ExtensionType::NextProtocolNegotiation,
            other => ExtensionType::Unknown(other),
        }
    }
}

impl From<ExtensionType> for u16 {
    fn from(value: ExtensionType) -> Self {
        match value {
            ExtensionType::ServerName => 0,
            ExtensionType::SupportedPointFormats => 11,
            ExtensionType::Alpn => 16,
            ExtensionType::SessionTicket => 35,
            ExtensionType::NextProtocolNegotiation => 13172,
            ExtensionType::Unknown(other) => other,
        }
    }
}
