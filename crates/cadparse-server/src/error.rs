//! 接口错误与 HTTP 状态码映射

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cadparse_file::FileError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 扩展名不支持、URL 无效等，处理前直接拒绝
    #[error("{0}")]
    Validation(String),

    /// 远程文件下载失败
    #[error("下载文件失败: {0}")]
    Download(String),

    #[error("DWG 转换失败")]
    Conversion,

    #[error("DXF 解析失败: {0}")]
    Parse(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unsupported_format() -> Self {
        ApiError::Validation("仅支持 dwg 或 dxf 格式".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Download(_) => StatusCode::BAD_GATEWAY,
            ApiError::Conversion | ApiError::Parse(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<FileError> for ApiError {
    fn from(e: FileError) -> Self {
        match e {
            FileError::UnsupportedFormat(_) => ApiError::unsupported_format(),
            FileError::Conversion => ApiError::Conversion,
            FileError::Parse(msg) => ApiError::Parse(msg),
            FileError::Io(e) => ApiError::Parse(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "请求处理失败");
        } else {
            tracing::info!(status = %status, error = %self, "请求被拒绝");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::unsupported_format().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Download("timeout".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(ApiError::Conversion.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ApiError::from(FileError::Parse("bad group code".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_parse_message_includes_cause() {
        let err = ApiError::from(FileError::Parse("bad group code".into()));
        assert_eq!(err.to_string(), "DXF 解析失败: bad group code");
    }
}
