//! CADParse 核心数据模型
//!
//! 描述从 DXF 图纸中提取出的结构化数据：
//! - `CadDocument`: 图层名列表 + 模型空间实体列表
//! - `Entity`: 公共属性（类型、图层、颜色、线型）+ 按类型区分的几何字段
//! - `Geometry`: 封闭的几何变体集合
//!
//! 所有类型只做坐标透传，不做任何几何计算。
//!
//! # 示例
//!
//! ```rust
//! use cadparse_core::prelude::*;
//!
//! let mut doc = CadDocument::new();
//! doc.push_layer("0");
//! doc.push_entity(Entity::new(
//!     "LINE",
//!     "0",
//!     Geometry::Line {
//!         start: Point3::new(0.0, 0.0, 0.0),
//!         end: Point3::new(10.0, 10.0, 0.0),
//!     },
//! ));
//! assert_eq!(doc.entity_count(), 1);
//! ```

pub mod document;
pub mod entity;
pub mod math;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::document::CadDocument;
    pub use crate::entity::{Entity, Geometry, COLOR_BY_BLOCK, COLOR_BY_LAYER};
    pub use crate::math::{Point3, Vector3};
}
