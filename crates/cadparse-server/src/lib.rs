//! CADParse HTTP 服务
//!
//! 接收上传或远程 URL 的 DWG/DXF 文件，DWG 先经外部转换器转为 DXF，
//! 再提取图层与实体，以 JSON 返回。

pub mod config;
pub mod download;
pub mod error;
pub mod routes;
pub mod service;
pub mod storage;

pub use config::AppConfig;
pub use error::ApiError;
pub use routes::router;
pub use service::ParseService;
