//! 服务配置
//!
//! 配置文件的位置按以下顺序确定：
//! 1. 命令行 `--config <路径>`
//! 2. 环境变量 `CADPARSE_CONFIG`
//! 3. 工作目录下的 `config/default.toml`（存在时）
//! 4. 以上都没有时使用内建默认值
//!
//! 加载在日志初始化之前进行，所以这里不打日志，结果交给调用方报告。

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cadparse_file::OdaFileConverter;
use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件的环境变量
pub const CONFIG_ENV: &str = "CADPARSE_CONFIG";

/// 工作目录下的默认配置文件
pub const WORKING_DIR_CONFIG: &str = "config/default.toml";

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("无法读取配置文件 {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件 {} 格式错误: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("无法确定工作目录: {0}")]
    WorkingDir(#[source] std::io::Error),
}

/// 配置来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Argument(PathBuf),
    Environment(PathBuf),
    WorkingDir(PathBuf),
    Builtin,
}

impl ConfigSource {
    /// 按查找顺序确定配置来源
    ///
    /// 显式指定的路径（参数或环境变量）即使不存在也会被选中，读取时再报错。
    pub fn locate(argument: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = argument {
            return Ok(Self::Argument(path));
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(Self::Environment(PathBuf::from(path)));
        }

        let candidate = std::env::current_dir()
            .map_err(ConfigError::WorkingDir)?
            .join(WORKING_DIR_CONFIG);
        Ok(if candidate.is_file() {
            Self::WorkingDir(candidate)
        } else {
            Self::Builtin
        })
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Argument(path) | Self::Environment(path) | Self::WorkingDir(path) => Some(path),
            Self::Builtin => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument(path) => write!(f, "--config {}", path.display()),
            Self::Environment(path) => write!(f, "${CONFIG_ENV} {}", path.display()),
            Self::WorkingDir(path) => write!(f, "{}", path.display()),
            Self::Builtin => f.write_str("内建默认值"),
        }
    }
}

/// 应用配置，所有段落和字段都可省略
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub converter: ConverterConfig,
    pub download: DownloadConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 解析 TOML 文本，`origin` 只用于错误信息
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Invalid {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// 从指定来源加载
    pub fn load(source: &ConfigSource) -> Result<Self, ConfigError> {
        match source.path() {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// 定位并加载配置；任何失败都退回内建默认值，同时把错误交给调用方
    pub fn load_or_default(argument: Option<PathBuf>) -> (Self, Result<ConfigSource, ConfigError>) {
        let loaded = ConfigSource::locate(argument)
            .and_then(|source| Self::load(&source).map(|config| (config, source)));
        match loaded {
            Ok((config, source)) => (config, Ok(source)),
            Err(err) => (Self::default(), Err(err)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// 上传文件大小上限（字节）
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

/// 临时目录：原始上传与转换结果分开存放
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub converted_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("upload_dir"),
            converted_dir: PathBuf::from("converted_dir"),
        }
    }
}

/// ODA File Converter 配置，未设置的字段沿用平台默认值
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    pub program: Option<PathBuf>,
    /// 包装命令，如 `["xvfb-run"]`；设为空数组表示直接调用
    pub wrapper: Option<Vec<String>>,
    pub output_version: Option<String>,
    pub output_format: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ConverterConfig {
    pub fn build(&self) -> OdaFileConverter {
        let mut converter = OdaFileConverter::default();
        if let Some(program) = &self.program {
            converter = converter.with_program(program);
        }
        if let Some(wrapper) = &self.wrapper {
            converter = converter.with_wrapper(wrapper);
        }
        if let Some(version) = &self.output_version {
            converter.output_version = version.clone();
        }
        if let Some(format) = &self.output_format {
            converter.output_format = format.clone();
        }
        if let Some(secs) = self.timeout_secs {
            converter = converter.with_timeout(Duration::from_secs(secs));
        }
        converter
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub timeout_secs: u64,
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// `RUST_LOG` 优先于这里的等级
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
