//! 提取结果文档
//!
//! 每次提取新建，序列化后即丢弃，不做持久化。

use crate::entity::Entity;
use serde::Serialize;

/// 从 DXF 中提取出的图纸结构
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CadDocument {
    /// 图层名，按图层表顺序，不去重
    pub layers: Vec<String>,
    /// 模型空间实体，按存储顺序
    pub entities: Vec<Entity>,
}

impl CadDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_layer(&mut self, name: impl Into<String>) {
        self.layers.push(name.into());
    }

    pub fn push_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Geometry;
    use serde_json::json;

    #[test]
    fn test_preserves_insertion_order() {
        let mut doc = CadDocument::new();
        for name in ["0", "墙体", "0", "门窗"] {
            doc.push_layer(name);
        }
        doc.push_entity(Entity::new("CIRCLE", "墙体", Geometry::None));
        doc.push_entity(Entity::new("LINE", "0", Geometry::None));

        assert_eq!(doc.layers, vec!["0", "墙体", "0", "门窗"]);
        let types: Vec<&str> = doc.entities.iter().map(|e| e.entity_type.as_str()).collect();
        assert_eq!(types, vec!["CIRCLE", "LINE"]);
        assert_eq!(doc.entity_count(), 2);
    }

    #[test]
    fn test_empty_document_serialization() {
        let value = serde_json::to_value(CadDocument::new()).unwrap();
        assert_eq!(value, json!({ "layers": [], "entities": [] }));
    }
}
