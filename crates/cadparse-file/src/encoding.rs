//! DXF 文本编码探测
//!
//! 国内图纸常见 UTF-8 与 GBK 混用，且文件头的 `$DWGCODEPAGE` 经常不可信。
//! 这里按候选顺序逐个尝试严格解码整个文件，第一个无错误的编码胜出；
//! 全部失败时按 Windows-1252 逐字节映射，保证不会因编码直接拒绝。
//!
//! 解码在这里完成，之后交给 DXF 库的一律是 UTF-8 文本：
//! R2007 及以上版本的文件会被 DXF 库强制按 UTF-8 读取，不做转码的话 GBK 图纸无法打开。

use std::borrow::Cow;

use encoding_rs::{Encoding, GBK, UTF_8, WINDOWS_1252};

/// 编码探测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedEncoding {
    /// 候选编码可无损解码整个文件
    Candidate(&'static Encoding),
    /// 所有候选都失败，按 Windows-1252 宽松解码
    Fallback,
}

impl ResolvedEncoding {
    /// 用于日志的编码名
    pub fn name(&self) -> &'static str {
        match self {
            ResolvedEncoding::Candidate(encoding) => encoding.name(),
            ResolvedEncoding::Fallback => "default",
        }
    }
}

/// 解码后的文件内容
#[derive(Debug)]
pub struct DecodedText<'a> {
    pub encoding: ResolvedEncoding,
    pub text: Cow<'a, str>,
}

/// 按优先级排列的编码候选列表
#[derive(Debug, Clone)]
pub struct EncodingResolver {
    candidates: Vec<&'static Encoding>,
}

impl Default for EncodingResolver {
    /// UTF-8 → GBK
    ///
    /// GB2312 是 GBK 的子集，GBK 失败的字节序列 GB2312 也必然失败；
    /// `encoding_rs` 中 GBK 与 GB18030 又共用同一个解码器。
    /// 所以 GBK 之后再排任何 GBK 系编码都不会改变结果，默认列表到 GBK 为止。
    fn default() -> Self {
        Self::new(vec![UTF_8, GBK])
    }
}

impl EncodingResolver {
    pub fn new(candidates: Vec<&'static Encoding>) -> Self {
        Self { candidates }
    }

    /// 选出第一个能无损解码 `bytes` 的编码
    pub fn resolve(&self, bytes: &[u8]) -> ResolvedEncoding {
        self.decode(bytes).encoding
    }

    /// 解码整个文件
    ///
    /// 候选编码严格解码；回退时 Windows-1252 为每个字节都定义了字符，不会失败。
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> DecodedText<'a> {
        for &encoding in &self.candidates {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
                return DecodedText {
                    encoding: ResolvedEncoding::Candidate(encoding),
                    text,
                };
            }
            tracing::debug!(encoding = encoding.name(), "编码尝试失败，继续下一个候选");
        }

        let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
        DecodedText {
            encoding: ResolvedEncoding::Fallback,
            text,
        }
    }
}
