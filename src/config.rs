use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::protocol::tls::handshake::MAX_HANDSHAKE_LEN;
use crate::protocol::tls::record::{MAX_CIPHERTEXT_LEN, MAX_RECORD_VERSION};

/// Peek 的读取上限
///
/// 默认值就是 TLS 本身允许的上限。配置只能收紧，不能放宽:
/// 超过默认值的字段在 [`PeekConfig::validated`] 中被截回默认值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeekConfig {
    /// 单个记录 payload 的最大长度
    pub max_record_len: usize,
    /// 记录头中版本号的上限 (不含)
    pub max_record_version: u16,
    /// 握手消息体的最大长度
    pub max_handshake_len: usize,
}

impl Default for PeekConfig {
    fn default() -> Self {
        Self {
            max_record_len: MAX_CIPHERTEXT_LEN,
            max_record_version: MAX_RECORD_VERSION,
            max_handshake_len: MAX_HANDSHAKE_LEN,
        }
    }
}

impl PeekConfig {
    /// 从 JSON 文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("配置文件无效: {}", path.display()))
    }

    /// 从 JSON 字符串解析配置
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("解析 JSON 配置失败")?;
        Ok(config.validated())
    }

    /// 把超出协议上限的字段截回默认值
    pub fn validated(self) -> Self {
        let defaults = Self::default();
        let mut config = self;

        if config.max_record_len > defaults.max_record_len {
            warn!(
                "max_record_len {} exceeds the TLS limit, using {}",
                config.max_record_len, defaults.max_record_len
            );
            config.max_record_len = defaults.max_record_len;
        }
        if config.max_record_version > defaults.max_record_version {
            warn!(
                "max_record_version {:#06x} exceeds the sanity ceiling, using {:#06x}",
                config.max_record_version, defaults.max_record_version
            );
            config.max_record_version = defaults.max_record_version;
        }
        if config.max_handshake_len > defaults.max_handshake_len {
            warn!(
                "max_handshake_len {} exceeds the TLS limit, using {}",
                config.max_handshake_len, defaults.max_handshake_len
            );
            config.max_handshake_len = defaults.max_handshake_len;
        }

        config
    }
}
