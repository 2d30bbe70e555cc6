//! 临时文件存储
//!
//! 每个请求在上传目录下拥有独立的子目录 `<uuid>/`，文件名带 `<uuid>_` 前缀；
//! 转换器按目录批量转换，独立子目录保证它只会看到本请求的文件。
//! 文件不做清理。

use std::io;
use std::path::{Path, PathBuf};

use cadparse_file::CadFormat;
use uuid::Uuid;

use crate::config::StorageConfig;

/// 已落盘的上传文件
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub id: Uuid,
    pub path: PathBuf,
    pub format: CadFormat,
}

/// 上传目录与转换目录
#[derive(Debug, Clone)]
pub struct ScratchStorage {
    upload_dir: PathBuf,
    converted_dir: PathBuf,
}

impl ScratchStorage {
    pub fn new(upload_dir: impl Into<PathBuf>, converted_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            converted_dir: converted_dir.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.upload_dir, &config.converted_dir)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn converted_dir(&self) -> &Path {
        &self.converted_dir
    }

    /// 启动时创建目录（已存在则忽略）
    pub async fn ensure_dirs(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.converted_dir).await?;
        Ok(())
    }

    /// 写入上传内容，返回落盘位置
    pub async fn stage(
        &self,
        file_name: &str,
        format: CadFormat,
        bytes: &[u8],
    ) -> io::Result<StagedUpload> {
        let id = Uuid::new_v4();
        let dir = self.upload_dir.join(id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{id}_{}", sanitize_file_name(file_name)));
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "上传文件已保存");
        Ok(StagedUpload { id, path, format })
    }

    /// 该上传对应的转换输出目录
    pub fn conversion_dir(&self, staged: &StagedUpload) -> PathBuf {
        self.converted_dir.join(staged.id.to_string())
    }
}

/// 只保留最后一个路径分量，防止目录穿越
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => "upload".to_string(),
        other => other.to_string(),
    }
}
