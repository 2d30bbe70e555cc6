//! CADParse 文件处理
//!
//! 支持：
//! - DWG → DXF 归一化（外部 ODA File Converter）
//! - DXF 编码自动探测（UTF-8 / GBK，最终宽松回退），统一转码为 UTF-8
//! - 组码扫描校验，保留 DXF 库不认识的实体
//! - 图层与模型空间实体的结构化提取
//! - MTEXT 富文本与 `\M+` 遗留转义解码

pub mod convert;
pub mod dxf_io;
pub mod dxf_raw;
pub mod encoding;
pub mod error;
pub mod text;

pub use convert::{normalize, CadFormat, Converter, OdaFileConverter};
pub use dxf_io::{convert_entity, dxf_type_name, extract, DxfExtractor};
pub use encoding::{DecodedText, EncodingResolver, ResolvedEncoding};
pub use error::FileError;
pub use text::decode_cad_text;
