//! 文件操作错误定义

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 外部转换器失败（非零退出、启动失败或超时不做区分）
    #[error("DWG conversion failed")]
    Conversion,

    #[error("DXF parse error: {0}")]
    Parse(String),
}

impl From<dxf::DxfError> for FileError {
    fn from(e: dxf::DxfError) -> Self {
        FileError::Parse(e.to_string())
    }
}
