//! 远程文件下载
//!
//! 文件名优先取 `Content-Disposition`，其次从 URL 最后一段中截取 `~` 之前的部分；
//! 两者都拿不到时返回 `None`，由调用方的扩展名校验拒绝。

use std::time::Duration;

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::Client;
use url::Url;

use crate::error::ApiError;

static EXT_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)filename\*\s*=\s*([A-Za-z0-9_-]*)'[^']*'([^;]+)"#).unwrap()
});
static QUOTED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)filename\s*=\s*"([^"]*)""#).unwrap());
static BARE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)filename\s*=\s*([^";\s]+)"#).unwrap());
static TILDE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\S+)~").unwrap());

/// 下载结果
#[derive(Debug)]
pub struct Downloaded {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
}

/// 构建下载用 HTTP 客户端（默认跟随重定向）
pub fn client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

/// 校验 URL 同时具备 scheme 与 host
pub fn validate_url(raw: &str) -> Result<Url, ApiError> {
    let invalid = || ApiError::Validation("无效的 URL".to_string());
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(invalid()),
    }
}

/// 从 `Content-Disposition` 头中取文件名
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    if let Some(caps) = EXT_VALUE.captures(header) {
        let value = caps[2].trim().trim_matches('"');
        let decoded = percent_decode_str(value);
        let name = if caps[1].eq_ignore_ascii_case("utf-8") || caps[1].is_empty() {
            decoded.decode_utf8_lossy().into_owned()
        } else {
            // 非 UTF-8 字符集按字节逐个映射
            decoded.map(char::from).collect()
        };
        if !name.is_empty() {
            return Some(name);
        }
    }

    QUOTED_VALUE
        .captures(header)
        .or_else(|| BARE_VALUE.captures(header))
        .map(|caps| caps[1].trim().to_string())
        .filter(|name| !name.is_empty())
}

/// 从 URL 最后一段中截取 `~` 之前的非空白部分
pub fn filename_from_url_path(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let segment = percent_decode_str(segment).decode_utf8_lossy();
    TILDE_NAME
        .captures(&segment)
        .map(|caps| caps[1].to_string())
}

/// 下载远程文件，非 2xx 状态视为失败
pub async fn fetch(client: &Client, url: &Url) -> Result<Downloaded, ApiError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| ApiError::Download(e.to_string()))?;

    let disposition = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_content_disposition);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::Download(e.to_string()))?;

    let filename = disposition.or_else(|| filename_from_url_path(url));
    tracing::info!(
        url = %url,
        size = bytes.len(),
        filename = filename.as_deref().unwrap_or("-"),
        "远程文件下载完成"
    );

    Ok(Downloaded {
        bytes: bytes.to_vec(),
        filename,
    })
}
