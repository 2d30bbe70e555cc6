//! 解析流程编排：校验 → 落盘 → 归一化 → 提取

use std::sync::Arc;

use cadparse_core::document::CadDocument;
use cadparse_file::{normalize, CadFormat, Converter, DxfExtractor, FileError};
use reqwest::Client;

use crate::config::AppConfig;
use crate::download;
use crate::error::ApiError;
use crate::storage::{ScratchStorage, StagedUpload};

/// 请求间共享的解析服务，本身不持有可变状态
pub struct ParseService {
    storage: ScratchStorage,
    converter: Arc<dyn Converter>,
    http: Client,
    extractor: DxfExtractor,
}

impl ParseService {
    pub fn new(storage: ScratchStorage, converter: Arc<dyn Converter>, http: Client) -> Self {
        Self {
            storage,
            converter,
            http,
            extractor: DxfExtractor::default(),
        }
    }

    pub fn from_config(config: &AppConfig) -> reqwest::Result<Self> {
        Ok(Self::new(
            ScratchStorage::from_config(&config.storage),
            Arc::new(config.converter.build()),
            download::client(config.download.timeout())?,
        ))
    }

    pub fn storage(&self) -> &ScratchStorage {
        &self.storage
    }

    /// 解析上传的文件
    pub async fn parse_upload(&self, file_name: &str, bytes: &[u8]) -> Result<CadDocument, ApiError> {
        // 扩展名不合法时不写任何文件
        let format = CadFormat::from_file_name(file_name).ok_or_else(ApiError::unsupported_format)?;
        let staged = self.storage.stage(file_name, format, bytes).await?;
        tracing::info!(file = file_name, format = format.extension(), id = %staged.id, "开始解析");
        self.process(staged).await
    }

    /// 下载远程文件后按上传流程解析
    pub async fn parse_from_url(&self, raw_url: &str) -> Result<CadDocument, ApiError> {
        let url = download::validate_url(raw_url)?;
        let downloaded = download::fetch(&self.http, &url).await?;
        let file_name = downloaded
            .filename
            .ok_or_else(ApiError::unsupported_format)?;
        self.parse_upload(&file_name, &downloaded.bytes).await
    }

    async fn process(&self, staged: StagedUpload) -> Result<CadDocument, ApiError> {
        let dest_dir = self.storage.conversion_dir(&staged);
        let dxf_path = normalize(self.converter.as_ref(), &staged.path, staged.format, &dest_dir)
            .await
            .map_err(|e| match e {
                FileError::Io(e) => ApiError::Internal(e.to_string()),
                other => other.into(),
            })?;

        let extractor = self.extractor.clone();
        let document = tokio::task::spawn_blocking(move || extractor.extract(&dxf_path))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;

        tracing::info!(
            id = %staged.id,
            layers = document.layer_count(),
            entities = document.entity_count(),
            "解析完成"
        );
        Ok(document)
    }
}
