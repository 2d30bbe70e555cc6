//! DWG → DXF 格式归一化
//!
//! DWG 本身不做解析，交给外部的 ODA File Converter 转换为 DXF。
//! 转换器通过 [`Converter`] trait 注入，测试中可以替换为假实现。

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::process::Command;

use crate::error::FileError;

/// 支持的输入格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadFormat {
    Dwg,
    Dxf,
}

impl CadFormat {
    /// 由扩展名识别（不区分大小写）
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "dwg" => Some(CadFormat::Dwg),
            "dxf" => Some(CadFormat::Dxf),
            _ => None,
        }
    }

    /// 由文件名最后一个 `.` 之后的后缀识别
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            CadFormat::Dwg => "dwg",
            CadFormat::Dxf => "dxf",
        }
    }
}

/// 外部格式转换能力
///
/// 将 `source_dir` 中的 DWG 转换为 DXF 写入 `dest_dir`，返回是否成功。
pub trait Converter: Send + Sync {
    fn convert<'a>(&'a self, source_dir: &'a Path, dest_dir: &'a Path) -> BoxFuture<'a, bool>;
}

/// 默认转换超时
pub const DEFAULT_CONVERT_TIMEOUT: Duration = Duration::from_secs(30);

/// ODA File Converter 调用参数
#[derive(Debug, Clone)]
pub struct OdaFileConverter {
    /// 转换器可执行文件
    pub program: PathBuf,
    /// 包装命令，如无头 Linux 下的 `xvfb-run`
    pub wrapper: Vec<OsString>,
    /// 输出版本
    pub output_version: String,
    /// 输出格式
    pub output_format: String,
    /// 是否递归子目录
    pub recurse: String,
    /// 是否审计修复
    pub audit: String,
    /// 输入文件过滤
    pub input_filter: String,
    pub timeout: Duration,
}

impl Default for OdaFileConverter {
    fn default() -> Self {
        let (program, wrapper) = if cfg!(target_os = "macos") {
            (
                PathBuf::from("/Applications/ODAFileConverter.app/Contents/MacOS/ODAFileConverter"),
                Vec::new(),
            )
        } else {
            (
                PathBuf::from("/usr/bin/ODAFileConverter"),
                vec![OsString::from("xvfb-run")],
            )
        };

        Self {
            program,
            wrapper,
            output_version: "ACAD2007".to_string(),
            output_format: "DXF".to_string(),
            recurse: "0".to_string(),
            audit: "0".to_string(),
            input_filter: "*.dwg".to_string(),
            timeout: DEFAULT_CONVERT_TIMEOUT,
        }
    }
}

impl OdaFileConverter {
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_wrapper<I, S>(mut self, wrapper: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.wrapper = wrapper.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 组装命令：`[wrapper...] program <src> <dst> <version> <format> <recurse> <audit> <filter>`
    pub fn command(&self, source_dir: &Path, dest_dir: &Path) -> Command {
        let mut argv: Vec<OsString> = self.wrapper.clone();
        argv.push(self.program.clone().into_os_string());

        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .arg(source_dir)
            .arg(dest_dir)
            .arg(&self.output_version)
            .arg(&self.output_format)
            .arg(&self.recurse)
            .arg(&self.audit)
            .arg(&self.input_filter)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn run(&self, source_dir: &Path, dest_dir: &Path) -> bool {
        let mut command = self.command(source_dir, dest_dir);

        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) if output.status.success() => true,
            Ok(Ok(output)) => {
                tracing::warn!(
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "DWG 转换失败"
                );
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(program = %self.program.display(), error = %e, "无法启动 DWG 转换器");
                false
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "DWG 转换超时");
                false
            }
        }
    }
}

impl Converter for OdaFileConverter {
    fn convert<'a>(&'a self, source_dir: &'a Path, dest_dir: &'a Path) -> BoxFuture<'a, bool> {
        Box::pin(self.run(source_dir, dest_dir))
    }
}

/// 归一化为 DXF 路径
///
/// - DXF：原样返回
/// - DWG：转换 `input` 所在目录到 `dest_dir`，返回 `dest_dir/<input 文件名>.dxf`
///
/// 转换器返回成功但没有生成预期文件时同样视为转换失败。
pub async fn normalize(
    converter: &dyn Converter,
    input: &Path,
    format: CadFormat,
    dest_dir: &Path,
) -> Result<PathBuf, FileError> {
    match format {
        CadFormat::Dxf => Ok(input.to_path_buf()),
        CadFormat::Dwg => {
            let source_dir = input.parent().unwrap_or_else(|| Path::new("."));
            let stem = input
                .file_stem()
                .ok_or_else(|| FileError::UnsupportedFormat(input.display().to_string()))?;
            let mut file_name = stem.to_os_string();
            file_name.push(".");
            file_name.push(CadFormat::Dxf.extension());
            let output = dest_dir.join(file_name);

            tokio::fs::create_dir_all(dest_dir).await?;

            if !converter.convert(source_dir, dest_dir).await {
                return Err(FileError::Conversion);
            }

            if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
                tracing::warn!(path = %output.display(), "转换器报告成功但未生成 DXF");
                return Err(FileError::Conversion);
            }

            tracing::info!(
                "Converted {} -> {}",
                input.display(),
                output.display()
            );
            Ok(output)
        }
    }
}
