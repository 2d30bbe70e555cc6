//! 实体定义
//!
//! 每个实体都带有公共字段（`type`、`layer`、`color`、`linetype`），
//! 其余字段由几何变体决定，序列化时平铺到同一个 JSON 对象中：
//!
//! | type | 额外字段 |
//! |---|---|
//! | TEXT / ATTRIB / MTEXT | `text`, `insert` |
//! | LINE | `start`, `end` |
//! | LWPOLYLINE | `points` |
//! | CIRCLE | `center`, `radius` |
//! | ARC | `center`, `radius`, `start_angle`, `end_angle` |
//! | ELLIPSE | `center`, `major_axis`, `ratio`, `start_param`, `end_param` |
//! | SPLINE | `degree`, `control_points` |
//! | 其他 | 无 |

use crate::math::{Point3, Vector3};
use serde::Serialize;

/// ACI 颜色：随层
pub const COLOR_BY_LAYER: i16 = 256;

/// ACI 颜色：随块
pub const COLOR_BY_BLOCK: i16 = 0;

/// 默认线型名
pub const LINETYPE_BY_LAYER: &str = "BYLAYER";

/// 图纸实体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    /// DXF 实体类型名，如 `LINE`、`MTEXT`
    #[serde(rename = "type")]
    pub entity_type: String,
    /// 所在图层（已解码）
    pub layer: String,
    /// 实体级 ACI 颜色，256 表示随层
    pub color: i16,
    /// 线型名
    pub linetype: String,
    /// 类型相关字段
    #[serde(flatten)]
    pub geometry: Geometry,
}

impl Entity {
    /// 创建实体，颜色与线型取随层默认值
    pub fn new(entity_type: impl Into<String>, layer: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            entity_type: entity_type.into(),
            layer: layer.into(),
            color: COLOR_BY_LAYER,
            linetype: LINETYPE_BY_LAYER.to_string(),
            geometry,
        }
    }

    pub fn with_color(mut self, color: i16) -> Self {
        self.color = color;
        self
    }

    pub fn with_linetype(mut self, linetype: impl Into<String>) -> Self {
        self.linetype = linetype.into();
        self
    }
}

/// 几何字段
///
/// 无标签序列化：只输出变体内部的字段，类型名由 `Entity::entity_type` 承载。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Geometry {
    /// TEXT、ATTRIB、MTEXT 共用
    Text { text: String, insert: Point3 },
    Line { start: Point3, end: Point3 },
    /// 每个顶点为 `[x, y, start_width, end_width, bulge]`
    LwPolyline { points: Vec<[f64; 5]> },
    Circle { center: Point3, radius: f64 },
    /// 角度单位为度
    Arc {
        center: Point3,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    /// 参数单位为弧度
    Ellipse {
        center: Point3,
        major_axis: Vector3,
        ratio: f64,
        start_param: f64,
        end_param: f64,
    },
    Spline {
        degree: i32,
        control_points: Vec<Point3>,
    },
    /// 未专门处理的实体类型，只保留公共字段
    None,
}

impl Geometry {
    /// 该变体输出的字段名（不含公共字段）
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            Geometry::Text { .. } => &["text", "insert"],
            Geometry::Line { .. } => &["start", "end"],
            Geometry::LwPolyline { .. } => &["points"],
            Geometry::Circle { .. } => &["center", "radius"],
            Geometry::Arc { .. } => &["center", "radius", "start_angle", "end_angle"],
            Geometry::Ellipse { .. } => {
                &["center", "major_axis", "ratio", "start_param", "end_param"]
            }
            Geometry::Spline { .. } => &["degree", "control_points"],
            Geometry::None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(value: &serde_json::Value) -> Vec<String> {
        let mut keys: Vec<String> = value
            .as_object()
            .expect("entity should serialize to an object")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_line_serialization() {
        let entity = Entity::new(
            "LINE",
            "0",
            Geometry::Line {
                start: Point3::new(0.0, 0.0, 0.0),
                end: Point3::new(10.0, 10.0, 0.0),
            },
        )
        .with_color(7)
        .with_linetype("CONTINUOUS");

        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "LINE",
                "layer": "0",
                "color": 7,
                "linetype": "CONTINUOUS",
                "start": [0.0, 0.0, 0.0],
                "end": [10.0, 10.0, 0.0]
            })
        );
    }

    #[test]
    fn test_unhandled_type_has_only_common_fields() {
        let entity = Entity::new("INSERT", "A", Geometry::None);
        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(keys(&value), vec!["color", "layer", "linetype", "type"]);
        assert_eq!(value["color"], json!(COLOR_BY_LAYER));
        assert_eq!(value["linetype"], json!("BYLAYER"));
    }

    #[test]
    fn test_field_names_match_serialized_keys() {
        let samples = vec![
            Geometry::Text {
                text: "门".to_string(),
                insert: Point3::origin(),
            },
            Geometry::LwPolyline {
                points: vec![[0.0, 0.0, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0, 0.5]],
            },
            Geometry::Circle {
                center: Point3::origin(),
                radius: 2.0,
            },
            Geometry::Arc {
                center: Point3::origin(),
                radius: 2.0,
                start_angle: 0.0,
                end_angle: 90.0,
            },
            Geometry::Ellipse {
                center: Point3::origin(),
                major_axis: Vector3::new(4.0, 0.0, 0.0),
                ratio: 0.5,
                start_param: 0.0,
                end_param: std::f64::consts::TAU,
            },
            Geometry::Spline {
                degree: 3,
                control_points: vec![Point3::origin(), Point3::new(1.0, 1.0, 0.0)],
            },
        ];

        for geometry in samples {
            let mut expected: Vec<String> = ["color", "layer", "linetype", "type"]
                .iter()
                .chain(geometry.field_names())
                .map(|s| s.to_string())
                .collect();
            expected.sort();

            let value = serde_json::to_value(Entity::new("X", "0", geometry)).unwrap();
            assert_eq!(keys(&value), expected);
        }
    }

    #[test]
    fn test_lwpolyline_points_are_tuples() {
        let entity = Entity::new(
            "LWPOLYLINE",
            "0",
            Geometry::LwPolyline {
                points: vec![[1.0, 2.0, 0.0, 0.0, 0.25]],
            },
        );
        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value["points"], json!([[1.0, 2.0, 0.0, 0.0, 0.25]]));
    }
}
