//! DXF 组码扫描
//!
//! `dxf` 库读取实体时会静默跳过不认识的实体类型（HATCH、MULTILEADER 等），
//! 实体内部的值解析失败也只会截断实体列表而不报错。
//! 这里先把整份文本拆成组码-值对，按组码的值类型逐一校验，
//! 再按 ENTITIES 段的原始顺序列出顶层实体及其公共属性。
//!
//! # 组码 (Group Code)
//!
//! 每个数据项由两行组成：
//! - 第一行：组码（数字）
//! - 第二行：值
//!
//! 实体公共属性用到的组码：
//! - 0: 实体类型
//! - 6: 线型名
//! - 8: 图层名
//! - 62: 颜色
//! - 66: 后随属性标志（INSERT）
//! - 67: 图纸空间标志
//! - 100: 子类标记

use crate::error::FileError;

/// DXF 组码-值对
#[derive(Debug, Clone)]
pub struct DxfPair {
    pub code: i32,
    pub value: String,
    /// 组码所在行号（从 1 开始）
    pub line: usize,
}

impl DxfPair {
    pub fn new(code: i32, value: impl Into<String>, line: usize) -> Self {
        Self {
            code,
            value: value.into(),
            line,
        }
    }

    /// 去掉首尾空白后的值
    pub fn text(&self) -> &str {
        self.value.trim()
    }

    /// 短整型按浮点解析后截断，部分软件会把 `70` 之类写成 `1.0`
    pub fn as_i16(&self) -> Option<i16> {
        self.text().parse::<f64>().ok().map(|v| v as i16)
    }

    fn is_marker(&self, value: &str) -> bool {
        self.code == 0 && self.text() == value
    }
}

/// 组码对应的值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Str,
    Double,
    Short,
    Integer,
    Long,
    Boolean,
    Binary,
}

fn value_kind(code: i32) -> Option<ValueKind> {
    use ValueKind::*;

    let kind = match code {
        0..=9 | 100..=102 | 105 | 300..=309 | 320..=369 | 390..=399 => Str,
        410..=419 | 430..=439 | 470..=481 | 999 | 1000..=1009 => Str,
        10..=59 | 110..=149 | 210..=239 | 460..=469 | 1010..=1059 => Double,
        60..=79 | 170..=179 | 270..=289 | 370..=389 | 400..=409 | 1060..=1070 => Short,
        90..=99 | 420..=429 | 440..=459 | 1071 => Integer,
        160..=169 => Long,
        290..=299 => Boolean,
        310..=319 => Binary,
        _ => return None,
    };
    Some(kind)
}

fn value_is_valid(kind: ValueKind, value: &str) -> bool {
    let value = value.trim();
    match kind {
        ValueKind::Str => true,
        ValueKind::Double | ValueKind::Short | ValueKind::Boolean => value.parse::<f64>().is_ok(),
        ValueKind::Integer => value.parse::<i32>().is_ok(),
        ValueKind::Long => value.parse::<i64>().is_ok(),
        ValueKind::Binary => {
            value.len() % 2 == 0 && value.bytes().all(|b| b.is_ascii_hexdigit())
        }
    }
}

fn parse_error(line: usize, message: impl std::fmt::Display) -> FileError {
    FileError::Parse(format!("第 {line} 行: {message}"))
}

/// ENTITIES 段中的一个顶层实体
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntity {
    /// 组码 0 的类型名
    pub kind: String,
    pub layer: String,
    pub color: i16,
    pub linetype: String,
    pub paper_space: bool,
    /// 组码 100 子类标记，按出现顺序
    pub subclasses: Vec<String>,
    /// 类型名所在行号
    pub line: usize,
}

impl RawEntity {
    fn from_pairs(pairs: &[DxfPair]) -> Self {
        let head = &pairs[0];
        let mut entity = RawEntity {
            kind: head.text().to_string(),
            layer: "0".to_string(),
            color: 256,
            linetype: "BYLAYER".to_string(),
            paper_space: false,
            subclasses: Vec::new(),
            line: head.line,
        };

        let (mut layer, mut color, mut linetype, mut space) = (false, false, false, false);
        for pair in &pairs[1..] {
            match pair.code {
                8 if !layer => {
                    entity.layer = pair.value.clone();
                    layer = true;
                }
                62 if !color => {
                    entity.color = pair.as_i16().unwrap_or(256);
                    color = true;
                }
                6 if !linetype => {
                    entity.linetype = pair.value.clone();
                    linetype = true;
                }
                67 if !space => {
                    entity.paper_space = pair.as_i16().unwrap_or(0) != 0;
                    space = true;
                }
                100 => entity.subclasses.push(pair.text().to_string()),
                _ => {}
            }
        }
        entity
    }

    pub fn has_subclass(&self, marker: &str) -> bool {
        self.subclasses.iter().any(|s| s == marker)
    }
}

/// DXF 原始扫描器
#[derive(Debug)]
pub struct DxfRawParser {
    pairs: Vec<DxfPair>,
}

impl DxfRawParser {
    /// 拆分组码-值对并校验段结构
    ///
    /// 以下情况返回 [`FileError::Parse`]：
    /// - 组码不是整数，或组码不属于任何已知值类型
    /// - 数值型组码的值无法解析
    /// - 文件为空、缺少 SECTION、缺少结尾 EOF、SECTION/ENDSEC 不配对
    pub fn parse(text: &str) -> Result<Self, FileError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut pairs = Vec::new();
        let mut lines = text.lines().enumerate();

        while let Some((index, code_line)) = lines.next() {
            let line = index + 1;
            let code_text = code_line.trim();
            if code_text.is_empty() && pairs.is_empty() {
                continue;
            }

            let code: i32 = code_text
                .parse()
                .map_err(|_| parse_error(line, format!("无效的组码 {code_text:?}")))?;
            let kind = value_kind(code)
                .ok_or_else(|| parse_error(line, format!("未知组码 {code}")))?;

            let Some((_, value)) = lines.next() else {
                return Err(parse_error(line, format!("组码 {code} 缺少值")));
            };
            if !value_is_valid(kind, value) {
                return Err(parse_error(
                    line + 1,
                    format!("组码 {code} 的值 {:?} 不是合法的 {kind:?}", value.trim()),
                ));
            }

            let pair = DxfPair::new(code, value.trim_end_matches('\r'), line);
            let at_eof = pair.is_marker("EOF");
            pairs.push(pair);
            if at_eof {
                break;
            }
        }

        let parser = Self { pairs };
        parser.check_sections()?;
        Ok(parser)
    }

    pub fn pairs(&self) -> &[DxfPair] {
        &self.pairs
    }

    fn check_sections(&self) -> Result<(), FileError> {
        let Some(last) = self.pairs.last() else {
            return Err(FileError::Parse("文件为空".to_string()));
        };

        let mut open: Option<usize> = None;
        let mut sections = 0usize;
        for (i, pair) in self.pairs.iter().enumerate() {
            if pair.code != 0 {
                continue;
            }
            match pair.text() {
                "SECTION" => {
                    if let Some(start) = open {
                        return Err(parse_error(pair.line, format!("第 {start} 行的段未以 ENDSEC 结束")));
                    }
                    match self.pairs.get(i + 1) {
                        Some(name) if name.code == 2 => {}
                        _ => return Err(parse_error(pair.line, "SECTION 后缺少段名")),
                    }
                    open = Some(pair.line);
                    sections += 1;
                }
                "ENDSEC" => {
                    if open.take().is_none() {
                        return Err(parse_error(pair.line, "多余的 ENDSEC"));
                    }
                }
                "EOF" => {
                    if let Some(start) = open {
                        return Err(parse_error(pair.line, format!("第 {start} 行的段未以 ENDSEC 结束")));
                    }
                }
                _ => {}
            }
        }

        if sections == 0 {
            return Err(FileError::Parse("缺少 SECTION".to_string()));
        }
        if !last.is_marker("EOF") {
            return Err(parse_error(last.line, "缺少结尾的 EOF"));
        }
        Ok(())
    }

    /// ENTITIES 段中每个实体的组码切片，按文件顺序
    fn entity_chunks(&self) -> Vec<&[DxfPair]> {
        let mut chunks = Vec::new();
        let mut in_entities = false;
        let mut start: Option<usize> = None;

        for (i, pair) in self.pairs.iter().enumerate() {
            if pair.code != 0 {
                continue;
            }
            if let Some(s) = start.take() {
                chunks.push(&self.pairs[s..i]);
            }
            match pair.text() {
                "SECTION" => {
                    in_entities = self
                        .pairs
                        .get(i + 1)
                        .is_some_and(|name| name.text() == "ENTITIES");
                }
                "ENDSEC" | "EOF" => in_entities = false,
                _ if in_entities => start = Some(i),
                _ => {}
            }
        }
        chunks
    }

    /// 顶层实体列表
    ///
    /// 从属实体并入其宿主，不单独列出：
    /// - POLYLINE 之后的 VERTEX 与一个 SEQEND
    /// - 带属性标志（66=1）的 INSERT 之后的 ATTRIB 与一个 SEQEND
    /// - 独立 ATTRIB/ATTDEF 紧随的一个 MTEXT（多行属性内容）
    pub fn entities(&self) -> Vec<RawEntity> {
        let chunks = self.entity_chunks();
        let mut entities = Vec::with_capacity(chunks.len());
        let mut i = 0;

        while i < chunks.len() {
            let chunk = chunks[i];
            let entity = RawEntity::from_pairs(chunk);
            i += 1;

            let kind_at = |idx: usize| chunks.get(idx).map(|c| c[0].text());
            match entity.kind.as_str() {
                "POLYLINE" => {
                    while kind_at(i) == Some("VERTEX") {
                        i += 1;
                    }
                    if kind_at(i) == Some("SEQEND") {
                        i += 1;
                    }
                }
                "INSERT" if has_attributes(chunk) => {
                    while kind_at(i) == Some("ATTRIB") {
                        i += 1;
                    }
                    if kind_at(i) == Some("SEQEND") {
                        i += 1;
                    }
                }
                "ATTRIB" | "ATTDEF" => {
                    if kind_at(i) == Some("MTEXT") {
                        i += 1;
                    }
                }
                _ => {}
            }

            entities.push(entity);
        }
        entities
    }
}

fn has_attributes(pairs: &[DxfPair]) -> bool {
    pairs
        .iter()
        .find(|p| p.code == 66)
        .and_then(DxfPair::as_i16)
        == Some(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(entities: &str) -> String {
        format!(
            "0\nSECTION\n2\nHEADER\n9\n$ACADVER\n1\nAC1015\n0\nENDSEC\n\
             0\nSECTION\n2\nENTITIES\n{entities}0\nENDSEC\n0\nEOF\n"
        )
    }

    fn kinds(text: &str) -> Vec<String> {
        DxfRawParser::parse(text)
            .unwrap()
            .entities()
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_common_fields_and_defaults() {
        let text = document(
            "0\nHATCH\n5\n2F\n8\n剖面线\n62\n3\n6\nDASHED\n100\nAcDbHatch\n0\nLINE\n10\n0.0\n",
        );
        let entities = DxfRawParser::parse(&text).unwrap().entities();

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].kind, "HATCH");
        assert_eq!(entities[0].layer, "剖面线");
        assert_eq!(entities[0].color, 3);
        assert_eq!(entities[0].linetype, "DASHED");
        assert!(entities[0].has_subclass("AcDbHatch"));

        assert_eq!(entities[1].layer, "0");
        assert_eq!(entities[1].color, 256);
        assert_eq!(entities[1].linetype, "BYLAYER");
        assert!(!entities[1].paper_space);
    }

    #[test]
    fn test_crlf_and_padded_codes() {
        let text = document("  0\nCIRCLE\n 67\n     1\n  8\nA\n").replace('\n', "\r\n");
        let entities = DxfRawParser::parse(&text).unwrap().entities();
        assert_eq!(entities[0].kind, "CIRCLE");
        assert_eq!(entities[0].layer, "A");
        assert!(entities[0].paper_space);
    }

    #[test]
    fn test_children_are_folded_into_host() {
        let text = document(
            "0\nPOLYLINE\n66\n1\n0\nVERTEX\n0\nVERTEX\n0\nSEQEND\n\
             0\nINSERT\n66\n1\n0\nATTRIB\n0\nATTRIB\n0\nSEQEND\n\
             0\nINSERT\n0\nATTRIB\n0\nSEQEND\n\
             0\nCIRCLE\n",
        );
        assert_eq!(
            kinds(&text),
            vec!["POLYLINE", "INSERT", "INSERT", "ATTRIB", "SEQEND", "CIRCLE"]
        );
    }

    #[test]
    fn test_only_entities_section_is_listed() {
        let text = "0\nSECTION\n2\nBLOCKS\n0\nBLOCK\n0\nLINE\n0\nENDBLK\n0\nENDSEC\n\
                    0\nSECTION\n2\nENTITIES\n0\nTEXT\n0\nENDSEC\n0\nEOF\n";
        assert_eq!(kinds(text), vec!["TEXT"]);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let text = document("0\nLINE\n8\n0\n10\nnot-a-number\n");
        let err = DxfRawParser::parse(&text).unwrap_err();
        match err {
            FileError::Parse(message) => assert!(message.contains("not-a-number"), "{message}"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_structure_errors() {
        for text in [
            "",
            "\n\n",
            "0\nEOF\n",
            "0\nSECTION\n2\nENTITIES\n0\nEOF\n",
            "0\nSECTION\n2\nENTITIES\n0\nENDSEC\n",
            "0\nSECTION\n0\nENDSEC\n0\nEOF\n",
            "0\nENDSEC\n0\nEOF\n",
            "abc\nSECTION\n",
            "0\nSECTION\n2",
        ] {
            assert!(
                matches!(DxfRawParser::parse(text), Err(FileError::Parse(_))),
                "{text:?}"
            );
        }
    }

    #[test]
    fn test_value_kinds() {
        assert!(value_is_valid(ValueKind::Short, " 1.0 "));
        assert!(value_is_valid(ValueKind::Binary, "00FFa1"));
        assert!(!value_is_valid(ValueKind::Binary, "0F1"));
        assert!(!value_is_valid(ValueKind::Integer, "1.5"));
        assert_eq!(value_kind(1071), Some(ValueKind::Integer));
        assert_eq!(value_kind(150), None);
    }
}
