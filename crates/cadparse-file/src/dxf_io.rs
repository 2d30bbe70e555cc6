//! DXF 结构化提取
//!
//! 打开 DXF（自动探测编码），遍历图层表与模型空间实体，
//! 投影为统一的 [`CadDocument`] 结构。
//!
//! 实体列表以组码扫描的结果为准，`dxf` 库解析出的实体按顺序对齐后补充几何数据；
//! 库不认识的实体类型（HATCH 等）只输出公共字段。

use std::path::Path;

use cadparse_core::document::CadDocument;
use cadparse_core::entity::{Entity, Geometry, COLOR_BY_BLOCK, COLOR_BY_LAYER};
use cadparse_core::math::{Point3, Vector3};
use dxf::entities::EntityType;
use encoding_rs::UTF_8;

use crate::dxf_raw::{DxfRawParser, RawEntity};
use crate::encoding::{EncodingResolver, ResolvedEncoding};
use crate::error::FileError;
use crate::text::decode_cad_text;

/// 二进制 DXF 文件头
const BINARY_SENTINEL: &[u8] = b"AutoCAD Binary DXF";

/// `dxf` 库能识别的尺寸标注子类
const TYPED_DIMENSIONS: [&str; 5] = [
    "AcDbAlignedDimension",
    "AcDbRadialDimension",
    "AcDbDiametricDimension",
    "AcDb3PointAngularDimension",
    "AcDbOrdinateDimension",
];

/// DXF 提取器
#[derive(Debug, Clone, Default)]
pub struct DxfExtractor {
    resolver: EncodingResolver,
}

impl DxfExtractor {
    /// 使用自定义编码候选列表
    pub fn new(resolver: EncodingResolver) -> Self {
        Self { resolver }
    }

    /// 从文件提取
    pub fn extract(&self, path: &Path) -> Result<CadDocument, FileError> {
        let bytes = std::fs::read(path)?;
        let document = self.extract_bytes(&bytes)?;

        tracing::info!(
            "Extracted {} layers, {} entities from {}",
            document.layer_count(),
            document.entity_count(),
            path.display()
        );

        Ok(document)
    }

    /// 从内存中的 DXF 内容提取
    ///
    /// 编码只影响解码方式，不会因编码失败而拒绝；
    /// 组码或段结构不合法时返回 [`FileError::Parse`]。
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<CadDocument, FileError> {
        if bytes.starts_with(BINARY_SENTINEL) {
            // 二进制 DXF 没有编码问题，也没有文本组码可扫描
            let drawing = dxf::Drawing::load(&mut &bytes[..])?;
            return Ok(project_typed(&drawing));
        }

        let decoded = self.resolver.decode(bytes);
        match decoded.encoding {
            ResolvedEncoding::Candidate(encoding) => {
                tracing::info!(encoding = encoding.name(), "使用候选编码读取 DXF");
            }
            ResolvedEncoding::Fallback => {
                tracing::warn!("所有候选编码均失败，按单字节宽松解码读取 DXF");
            }
        }

        let raw = DxfRawParser::parse(&decoded.text)?;
        let drawing = dxf::Drawing::load_with_encoding(&mut decoded.text.as_bytes(), UTF_8)?;
        Ok(project(&raw.entities(), &drawing))
    }
}

/// 使用默认编码候选（UTF-8 → GBK）从文件提取
pub fn extract(path: &Path) -> Result<CadDocument, FileError> {
    DxfExtractor::default().extract(path)
}

fn push_layers(document: &mut CadDocument, drawing: &dxf::Drawing) {
    // 图层表：保持表内顺序，名称需要解码
    for layer in drawing.layers() {
        document.push_layer(decode_cad_text(&layer.name));
    }
}

/// 按扫描顺序输出实体，能对齐的补充 `dxf` 解析出的几何
fn project(raw_entities: &[RawEntity], drawing: &dxf::Drawing) -> CadDocument {
    let mut document = CadDocument::new();
    push_layers(&mut document, drawing);

    let mut typed = drawing.entities().peekable();
    for raw in raw_entities {
        let typed_here = is_typed_by_dxf(raw);
        let matched = if typed_here {
            typed.next_if(|entity| same_kind(raw, entity))
        } else {
            None
        };

        if typed_here && matched.is_none() {
            tracing::warn!(kind = %raw.kind, line = raw.line, "实体未能与解析结果对齐，只输出公共字段");
        }

        // 模型空间实体：跳过图纸空间（组码 67）
        if raw.paper_space {
            continue;
        }

        let entity = match matched {
            Some(entity) => convert_entity(entity),
            None => common_only(raw),
        };
        document.push_entity(entity);
    }

    let leftover = typed.count();
    if leftover > 0 {
        tracing::warn!(leftover, "部分解析出的实体没有对应的扫描记录");
    }

    document
}

/// 只有 `dxf` 解析结果可用时的投影（二进制 DXF）
fn project_typed(drawing: &dxf::Drawing) -> CadDocument {
    let mut document = CadDocument::new();
    push_layers(&mut document, drawing);

    for entity in drawing
        .entities()
        .filter(|e| !e.common.is_in_paper_space)
    {
        document.push_entity(convert_entity(entity));
    }

    document
}

/// `dxf` 库会为该实体产出一个顶层对象
fn is_typed_by_dxf(raw: &RawEntity) -> bool {
    match raw.kind.as_str() {
        "DIMENSION" => TYPED_DIMENSIONS.iter().any(|marker| raw.has_subclass(marker)),
        "3DLINE" => true,
        kind => TYPE_NAMES.contains(&kind),
    }
}

fn same_kind(raw: &RawEntity, entity: &dxf::entities::Entity) -> bool {
    let kind = match raw.kind.as_str() {
        "3DLINE" => "LINE",
        kind => kind,
    };
    dxf_type_name(&entity.specific) == kind
}

/// 库不认识的实体：类型名与公共字段取自组码
fn common_only(raw: &RawEntity) -> Entity {
    Entity::new(raw.kind.clone(), decode_cad_text(&raw.layer), Geometry::None)
        .with_color(raw.color)
        .with_linetype(raw.linetype.clone())
}

/// 将 DXF 实体转换为统一实体记录
pub fn convert_entity(entity: &dxf::entities::Entity) -> Entity {
    let (entity_type, geometry) = match &entity.specific {
        EntityType::Text(text) => (
            "TEXT".to_string(),
            Geometry::Text {
                text: decode_cad_text(&text.value),
                insert: point(&text.location),
            },
        ),

        EntityType::Attribute(attrib) => (
            "ATTRIB".to_string(),
            Geometry::Text {
                text: decode_cad_text(&attrib.value),
                insert: point(&attrib.location),
            },
        ),

        EntityType::MText(mtext) => {
            // 组码 3 的续行在前，组码 1 的末段在后
            let mut raw = mtext.extended_text.concat();
            raw.push_str(&mtext.text);
            (
                "MTEXT".to_string(),
                Geometry::Text {
                    text: decode_cad_text(&raw),
                    insert: point(&mtext.insertion_point),
                },
            )
        }

        EntityType::Line(line) => (
            "LINE".to_string(),
            Geometry::Line {
                start: point(&line.p1),
                end: point(&line.p2),
            },
        ),

        EntityType::LwPolyline(lwpoly) => (
            "LWPOLYLINE".to_string(),
            Geometry::LwPolyline {
                points: lwpoly
                    .vertices
                    .iter()
                    .map(|v| [v.x, v.y, v.starting_width, v.ending_width, v.bulge])
                    .collect(),
            },
        ),

        EntityType::Circle(circle) => (
            "CIRCLE".to_string(),
            Geometry::Circle {
                center: point(&circle.center),
                radius: circle.radius,
            },
        ),

        EntityType::Arc(arc) => (
            "ARC".to_string(),
            Geometry::Arc {
                center: point(&arc.center),
                radius: arc.radius,
                start_angle: arc.start_angle,
                end_angle: arc.end_angle,
            },
        ),

        EntityType::Ellipse(ellipse) => (
            "ELLIPSE".to_string(),
            Geometry::Ellipse {
                center: point(&ellipse.center),
                major_axis: vector(&ellipse.major_axis),
                ratio: ellipse.minor_axis_ratio,
                start_param: ellipse.start_parameter,
                end_param: ellipse.end_parameter,
            },
        ),

        EntityType::Spline(spline) => (
            "SPLINE".to_string(),
            Geometry::Spline {
                degree: spline.degree_of_curve,
                control_points: spline.control_points.iter().map(point).collect(),
            },
        ),

        other => (dxf_type_name(other).to_string(), Geometry::None),
    };

    Entity {
        entity_type,
        layer: decode_cad_text(&entity.common.layer),
        color: aci_value(&entity.common.color),
        linetype: entity.common.line_type_name.clone(),
        geometry,
    }
}

/// `dxf` 库支持的实体类型名（组码 0）
const TYPE_NAMES: [&str; 41] = [
    "3DFACE",
    "3DSOLID",
    "ACAD_PROXY_ENTITY",
    "ARC",
    "ARCALIGNEDTEXT",
    "ATTDEF",
    "ATTRIB",
    "BODY",
    "CIRCLE",
    "DIMENSION",
    "ELLIPSE",
    "HELIX",
    "IMAGE",
    "INSERT",
    "LEADER",
    "LIGHT",
    "LINE",
    "LWPOLYLINE",
    "MLINE",
    "MTEXT",
    "OLEFRAME",
    "OLE2FRAME",
    "POINT",
    "POLYLINE",
    "RAY",
    "REGION",
    "RTEXT",
    "SECTION",
    "SEQEND",
    "SHAPE",
    "SOLID",
    "SPLINE",
    "TEXT",
    "TOLERANCE",
    "TRACE",
    "DGNUNDERLAY",
    "DWFUNDERLAY",
    "PDFUNDERLAY",
    "VERTEX",
    "WIPEOUT",
    "XLINE",
];

/// 实体在 DXF 文件中的类型名
pub fn dxf_type_name(specific: &EntityType) -> &'static str {
    match specific {
        EntityType::Face3D(_) => "3DFACE",
        EntityType::Solid3D(_) => "3DSOLID",
        EntityType::ProxyEntity(_) => "ACAD_PROXY_ENTITY",
        EntityType::Arc(_) => "ARC",
        EntityType::ArcAlignedText(_) => "ARCALIGNEDTEXT",
        EntityType::AttributeDefinition(_) => "ATTDEF",
        EntityType::Attribute(_) => "ATTRIB",
        EntityType::Body(_) => "BODY",
        EntityType::Circle(_) => "CIRCLE",
        EntityType::RotatedDimension(_)
        | EntityType::RadialDimension(_)
        | EntityType::DiameterDimension(_)
        | EntityType::AngularThreePointDimension(_)
        | EntityType::OrdinateDimension(_) => "DIMENSION",
        EntityType::Ellipse(_) => "ELLIPSE",
        EntityType::Helix(_) => "HELIX",
        EntityType::Image(_) => "IMAGE",
        EntityType::Insert(_) => "INSERT",
        EntityType::Leader(_) => "LEADER",
        EntityType::Light(_) => "LIGHT",
        EntityType::Line(_) => "LINE",
        EntityType::LwPolyline(_) => "LWPOLYLINE",
        EntityType::MLine(_) => "MLINE",
        EntityType::MText(_) => "MTEXT",
        EntityType::OleFrame(_) => "OLEFRAME",
        EntityType::Ole2Frame(_) => "OLE2FRAME",
        EntityType::ModelPoint(_) => "POINT",
        EntityType::Polyline(_) => "POLYLINE",
        EntityType::Ray(_) => "RAY",
        EntityType::Region(_) => "REGION",
        EntityType::RText(_) => "RTEXT",
        EntityType::Section(_) => "SECTION",
        EntityType::Seqend(_) => "SEQEND",
        EntityType::Shape(_) => "SHAPE",
        EntityType::Solid(_) => "SOLID",
        EntityType::Spline(_) => "SPLINE",
        EntityType::Text(_) => "TEXT",
        EntityType::Tolerance(_) => "TOLERANCE",
        EntityType::Trace(_) => "TRACE",
        EntityType::DgnUnderlay(_) => "DGNUNDERLAY",
        EntityType::DwfUnderlay(_) => "DWFUNDERLAY",
        EntityType::PdfUnderlay(_) => "PDFUNDERLAY",
        EntityType::Vertex(_) => "VERTEX",
        EntityType::Wipeout(_) => "WIPEOUT",
        EntityType::XLine(_) => "XLINE",
    }
}

/// DXF颜色转ACI数值：256 随层，0 随块
fn aci_value(color: &dxf::Color) -> i16 {
    if color.is_by_layer() {
        COLOR_BY_LAYER
    } else if color.is_by_block() {
        COLOR_BY_BLOCK
    } else {
        color.index().map(i16::from).unwrap_or(COLOR_BY_LAYER)
    }
}

fn point(p: &dxf::Point) -> Point3 {
    Point3::new(p.x, p.y, p.z)
}

fn vector(v: &dxf::Vector) -> Vector3 {
    Vector3::new(v.x, v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(specific: EntityType) -> dxf::entities::Entity {
        let mut entity = dxf::entities::Entity::new(specific);
        entity.common.layer = "0".to_string();
        entity.common.color = dxf::Color::from_index(7);
        entity.common.line_type_name = "CONTINUOUS".to_string();
        entity
    }

    #[test]
    fn test_convert_line() {
        let mut line = dxf::entities::Line::default();
        line.p1 = dxf::Point::new(0.0, 0.0, 0.0);
        line.p2 = dxf::Point::new(10.0, 10.0, 0.0);

        let entity = convert_entity(&wrap(EntityType::Line(line)));
        assert_eq!(entity.entity_type, "LINE");
        assert_eq!(entity.layer, "0");
        assert_eq!(entity.color, 7);
        assert_eq!(entity.linetype, "CONTINUOUS");
        assert_eq!(
            entity.geometry,
            Geometry::Line {
                start: Point3::new(0.0, 0.0, 0.0),
                end: Point3::new(10.0, 10.0, 0.0),
            }
        );
    }

    #[test]
    fn test_convert_attrib_uses_text_fields() {
        let mut attrib = dxf::entities::Attribute::default();
        attrib.value = r"\M+C4E3".to_string();
        attrib.location = dxf::Point::new(1.0, 2.0, 0.0);

        let entity = convert_entity(&wrap(EntityType::Attribute(attrib)));
        assert_eq!(entity.entity_type, "ATTRIB");
        assert_eq!(
            entity.geometry,
            Geometry::Text {
                text: "你".to_string(),
                insert: Point3::new(1.0, 2.0, 0.0),
            }
        );
    }

    #[test]
    fn test_convert_mtext_joins_chunks_and_strips_format() {
        let mut mtext = dxf::entities::MText::default();
        mtext.extended_text = vec![r"{\fSimSun;标".to_string()];
        mtext.text = r"题}\M+C4E3".to_string();
        mtext.insertion_point = dxf::Point::new(5.0, 6.0, 0.0);

        let entity = convert_entity(&wrap(EntityType::MText(mtext)));
        assert_eq!(entity.entity_type, "MTEXT");
        assert_eq!(
            entity.geometry,
            Geometry::Text {
                text: "标题你".to_string(),
                insert: Point3::new(5.0, 6.0, 0.0),
            }
        );
    }

    #[test]
    fn test_convert_lwpolyline_vertices() {
        let mut lwpoly = dxf::entities::LwPolyline::default();
        lwpoly.vertices = [(0.0, 0.0, 1.0), (10.0, 0.0, 0.0)]
            .iter()
            .map(|&(x, y, bulge)| {
                let mut vertex = dxf::LwPolylineVertex::default();
                vertex.x = x;
                vertex.y = y;
                vertex.bulge = bulge;
                vertex
            })
            .collect();

        let entity = convert_entity(&wrap(EntityType::LwPolyline(lwpoly)));
        assert_eq!(
            entity.geometry,
            Geometry::LwPolyline {
                points: vec![[0.0, 0.0, 0.0, 0.0, 1.0], [10.0, 0.0, 0.0, 0.0, 0.0]],
            }
        );
    }

    #[test]
    fn test_convert_ellipse_and_spline() {
        let mut ellipse = dxf::entities::Ellipse::default();
        ellipse.center = dxf::Point::new(1.0, 1.0, 0.0);
        ellipse.major_axis = dxf::Vector::new(3.0, 0.0, 0.0);
        ellipse.minor_axis_ratio = 0.5;
        ellipse.start_parameter = 0.0;
        ellipse.end_parameter = std::f64::consts::PI;

        let entity = convert_entity(&wrap(EntityType::Ellipse(ellipse)));
        assert_eq!(
            entity.geometry,
            Geometry::Ellipse {
                center: Point3::new(1.0, 1.0, 0.0),
                major_axis: Vector3::new(3.0, 0.0, 0.0),
                ratio: 0.5,
                start_param: 0.0,
                end_param: std::f64::consts::PI,
            }
        );

        let mut spline = dxf::entities::Spline::default();
        spline.degree_of_curve = 3;
        spline.control_points = vec![
            dxf::Point::new(0.0, 0.0, 0.0),
            dxf::Point::new(1.0, 2.0, 0.0),
            dxf::Point::new(3.0, 2.0, 0.0),
            dxf::Point::new(4.0, 0.0, 0.0),
        ];

        let entity = convert_entity(&wrap(EntityType::Spline(spline)));
        match entity.geometry {
            Geometry::Spline {
                degree,
                control_points,
            } => {
                assert_eq!(degree, 3);
                assert_eq!(control_points.len(), 4);
                assert_eq!(control_points[1], Point3::new(1.0, 2.0, 0.0));
            }
            other => panic!("expected spline geometry, got {other:?}"),
        }
    }

    #[test]
    fn test_unhandled_types_keep_common_fields_only() {
        let entity = convert_entity(&wrap(EntityType::ModelPoint(
            dxf::entities::ModelPoint::default(),
        )));
        assert_eq!(entity.entity_type, "POINT");
        assert_eq!(entity.geometry, Geometry::None);

        let entity = convert_entity(&wrap(EntityType::Insert(dxf::entities::Insert::default())));
        assert_eq!(entity.entity_type, "INSERT");
        assert_eq!(entity.geometry, Geometry::None);
    }

    #[test]
    fn test_layer_name_is_decoded() {
        let mut entity = wrap(EntityType::Circle(dxf::entities::Circle::default()));
        entity.common.layer = r"\M+C7BD\M+CCE5".to_string();
        assert_eq!(convert_entity(&entity).layer, "墙体");
    }

    #[test]
    fn test_by_layer_color_sentinel() {
        let entity = dxf::entities::Entity::new(EntityType::Line(dxf::entities::Line::default()));
        assert_eq!(convert_entity(&entity).color, COLOR_BY_LAYER);
    }

    #[test]
    fn test_type_names_follow_dxf_spelling() {
        let cases = [
            (EntityType::Solid3D(Default::default()), "3DSOLID"),
            (EntityType::ProxyEntity(Default::default()), "ACAD_PROXY_ENTITY"),
            (EntityType::OrdinateDimension(Default::default()), "DIMENSION"),
            (EntityType::AngularThreePointDimension(Default::default()), "DIMENSION"),
            (EntityType::Ole2Frame(Default::default()), "OLE2FRAME"),
            (EntityType::XLine(Default::default()), "XLINE"),
        ];
        for (specific, name) in cases {
            assert_eq!(convert_entity(&wrap(specific)).entity_type, name);
        }
    }

    #[test]
    fn test_every_type_name_is_known() {
        for name in TYPE_NAMES {
            let raw = RawEntity {
                kind: name.to_string(),
                layer: "0".to_string(),
                color: 256,
                linetype: "BYLAYER".to_string(),
                paper_space: false,
                subclasses: vec!["AcDbOrdinateDimension".to_string()],
                line: 1,
            };
            assert!(is_typed_by_dxf(&raw), "{name}");
        }
    }
}
