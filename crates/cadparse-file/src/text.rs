//! CAD 文本解码
//!
//! 处理 TEXT/MTEXT 内容和图层名中常见的两类遗留编码：
//!
//! 1. MTEXT 富文本格式组 `{\<控制码>;<内容>}`：只保留内容
//! 2. `\M+<十六进制>` 转义：按 GBK 双字节编码还原为汉字；
//!    顺带处理 DXF 的 `\U+XXXX` 码位转义
//!
//! `encoding_rs` 的 GBK 解码器与 GB18030 共用，会接受四字节序列与单字节 0x80，
//! 这里先按 GBK 的单/双字节结构检查，再交给解码器。
//!
//! 解码是全函数：单个转义失败只会把该转义替换为空串，
//! 不影响同一字符串中的其他转义，更不会中断整张图纸的提取。

use std::borrow::Cow;

use encoding_rs::GBK;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// 富文本格式组，如 `{\fSimSun|b0|i0|c134;标题}`
static RICH_TEXT_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\\.*?;([^}]+)\}").expect("rich text pattern is valid"));

/// 遗留转义：`\M+1C4E3`（GBK 字节）或 `\U+4E2D`（Unicode 码位）
static LEGACY_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\M\+([0-9A-Fa-f]+)|\\U\+([0-9A-Fa-f]{4})").expect("escape pattern is valid")
});

/// 完整解码：先去除富文本格式组，再还原转义
pub fn decode_cad_text(raw: &str) -> String {
    let stripped = strip_rich_text(raw);
    decode_unicode_escapes(&stripped).into_owned()
}

/// 去除富文本格式组，保留其内容
///
/// 从左到右、不重叠地替换。
pub fn strip_rich_text(raw: &str) -> Cow<'_, str> {
    RICH_TEXT_GROUP.replace_all(raw, "$1")
}

/// 还原 `\M+` 与 `\U+` 转义
///
/// 替换结果按字面插入，不会被再次扫描。
pub fn decode_unicode_escapes(raw: &str) -> Cow<'_, str> {
    LEGACY_ESCAPE.replace_all(raw, |caps: &Captures<'_>| {
        let decoded = match (caps.get(1), caps.get(2)) {
            (Some(gbk), _) => decode_escape(gbk.as_str()),
            (None, Some(code)) => decode_code_point(code.as_str()),
            (None, None) => None,
        };
        decoded.unwrap_or_default()
    })
}

/// `\U+XXXX`，代理项等非法码位丢弃
fn decode_code_point(hex: &str) -> Option<String> {
    let value = u32::from_str_radix(hex, 16).ok()?;
    char::from_u32(value).map(String::from)
}

/// 解码单个转义的十六进制串，失败返回 `None`
fn decode_escape(hex: &str) -> Option<String> {
    let padded: Cow<'_, str> = if hex.len() % 2 == 1 {
        Cow::Owned(format!("0{hex}"))
    } else {
        Cow::Borrowed(hex)
    };

    let Some(bytes) = hex_to_bytes(&padded) else {
        tracing::debug!(escape = %hex, "跳过非法的 \\M+ 转义");
        return None;
    };

    if !is_gbk_sequence(&bytes) {
        tracing::debug!(escape = %padded, "\\M+ 转义不是合法的 GBK 序列，已丢弃");
        return None;
    }

    GBK.decode_without_bom_handling_and_without_replacement(&bytes)
        .map(Cow::into_owned)
}

/// 只由 ASCII 与 GBK 双字节（首字节 81-FE，尾字节 40-FE 且非 7F）组成
fn is_gbk_sequence(bytes: &[u8]) -> bool {
    let mut rest = bytes;
    loop {
        match rest {
            [] => return true,
            [b, tail @ ..] if b.is_ascii() => rest = tail,
            [0x81..=0xfe, trail @ 0x40..=0xfe, tail @ ..] if *trail != 0x7f => rest = tail,
            _ => return false,
        }
    }
}

/// 偶数长度的十六进制串转字节
fn hex_to_bytes(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    hex.as_bytes()
        .chunks(2)
        .map(|pair| {
            let digits = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(digits, 16).ok()
        })
        .collect()
}
