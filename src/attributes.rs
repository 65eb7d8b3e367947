//! Attribute records and the recursive attribute decoder.
use crate::constant_pool::ConstantPool;
use crate::error::{DecodeError, Result};
use crate::reader::BinaryCursor;

/// Every attribute name the decoder accepts. Only `Code`, `SourceFile` and
/// `LineNumberTable` are decoded further, the rest are skipped over.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    ConstantValue,
    Code,
    StackMapTable,
    Exceptions,
    InnerClasses,
    EnclosingMethod,
    Synthetic,
    Signature,
    SourceFile,
    SourceDebugExtension,
    LineNumberTable,
    LocalVariableTable,
    LocalVariableTypeTable,
    Deprecated,
    RuntimeVisibleAnnotations,
    RuntimeInvisibleAnnotations,
    RuntimeVisibleParameterAnnotations,
    RuntimeInvisibleParameterAnnotations,
    RuntimeVisibleTypeAnnotations,
    RuntimeInvisibleTypeAnnotations,
    AnnotationDefault,
    BootstrapMethods,
}

impl AttributeKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "ConstantValue" => Self::ConstantValue,
            "Code" => Self::Code,
            "StackMapTable" => Self::StackMapTable,
            "Exceptions" => Self::Exceptions,
            "InnerClasses" => Self::InnerClasses,
            "EnclosingMethod" => Self::EnclosingMethod,
            "Synthetic" => Self::Synthetic,
            "Signature" => Self::Signature,
            "SourceFile" => Self::SourceFile,
            "SourceDebugExtension" => Self::SourceDebugExtension,
            "LineNumberTable" => Self::LineNumberTable,
            "LocalVariableTable" => Self::LocalVariableTable,
            "LocalVariableTypeTable" => Self::LocalVariableTypeTable,
            "Deprecated" => Self::Deprecated,
            "RuntimeVisibleAnnotations" => Self::RuntimeVisibleAnnotations,
            "RuntimeInvisibleAnnotations" => Self::RuntimeInvisibleAnnotations,
            "RuntimeVisibleParameterAnnotations" => Self::RuntimeVisibleParameterAnnotations,
            "RuntimeInvisibleParameterAnnotations" => Self::RuntimeInvisibleParameterAnnotations,
            "RuntimeVisibleTypeAnnotations" => Self::RuntimeVisibleTypeAnnotations,
            "RuntimeInvisibleTypeAnnotations" => Self::RuntimeInvisibleTypeAnnotations,
            "AnnotationDefault" => Self::AnnotationDefault,
            "BootstrapMethods" => Self::BootstrapMethods,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ConstantValue => "ConstantValue",
            Self::Code => "Code",
            Self::StackMapTable => "StackMapTable",
            Self::Exceptions => "Exceptions",
            Self::InnerClasses => "InnerClasses",
            Self::EnclosingMethod => "EnclosingMethod",
            Self::Synthetic => "Synthetic",
            Self::Signature => "Signature",
            Self::SourceFile => "SourceFile",
            Self::SourceDebugExtension => "SourceDebugExtension",
            Self::LineNumberTable => "LineNumberTable",
            Self::LocalVariableTable => "LocalVariableTable",
            Self::LocalVariableTypeTable => "LocalVariableTypeTable",
            Self::Deprecated => "Deprecated",
            Self::RuntimeVisibleAnnotations => "RuntimeVisibleAnnotations",
            Self::RuntimeInvisibleAnnotations => "RuntimeInvisibleAnnotations",
            Self::RuntimeVisibleParameterAnnotations => "RuntimeVisibleParameterAnnotations",
            Self::RuntimeInvisibleParameterAnnotations => "RuntimeInvisibleParameterAnnotations",
            Self::RuntimeVisibleTypeAnnotations => "RuntimeVisibleTypeAnnotations",
            Self::RuntimeInvisibleTypeAnnotations => "RuntimeInvisibleTypeAnnotations",
            Self::AnnotationDefault => "AnnotationDefault",
            Self::BootstrapMethods => "BootstrapMethods",
        }
    }
}

/// A decoded attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeInfo {
    Code(CodeAttribute),
    SourceFile {
        sourcefile_index: u16,
        sourcefile: String,
    },
    LineNumberTable(Vec<LineNumberEntry>),
    /// A recognized attribute whose payload was consumed but not decoded.
    Opaque { kind: AttributeKind, length: u32 },
}

impl AttributeInfo {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Code(_) => AttributeKind::Code,
            Self::SourceFile { .. } => AttributeKind::SourceFile,
            Self::LineNumberTable(_) => AttributeKind::LineNumberTable,
            Self::Opaque { kind, .. } => *kind,
        }
    }
}

/// Executable body of a method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    /// The line number table nested in this code body, if any.
    pub fn line_numbers(&self) -> Option<&[LineNumberEntry]> {
        self.attributes.iter().find_map(|attribute| match attribute {
            AttributeInfo::LineNumberTable(entries) => Some(entries.as_slice()),
            _ => None,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub start_pc: u16,
    pub line_number: u16,
}

/// Decode `count` consecutive attributes.
pub fn parse_attributes(
    cursor: &mut BinaryCursor,
    pool: &ConstantPool,
    count: u16,
) -> Result<Vec<AttributeInfo>> {
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        attributes.push(parse_attribute(cursor, pool)?);
    }
    Ok(attributes)
}

/// Decode one attribute. Exactly `6 + length` bytes are consumed from
/// `cursor` whatever the attribute kind.
pub fn parse_attribute(cursor: &mut BinaryCursor, pool: &ConstantPool) -> Result<AttributeInfo> {
    let offset = cursor.position();
    let name_index = cursor.read_u16()?;
    let name = pool
        .utf8(name_index)
        .ok_or_else(|| DecodeError::unresolved(name_index, "Utf8", offset))?;
    let kind = AttributeKind::from_name(name).ok_or_else(|| DecodeError::UnknownAttribute {
        name: name.to_owned(),
        offset,
    })?;
    let length = cursor.read_u32()?;
    let mut payload = cursor.sub_cursor(length as usize)?;
    log::debug!("attribute {} ({} bytes) at offset {}", kind.name(), length, offset);

    let attribute = match kind {
        AttributeKind::Code => AttributeInfo::Code(parse_code(&mut payload, pool)?),
        AttributeKind::SourceFile => {
            let index_offset = payload.position();
            let sourcefile_index = payload.read_u16()?;
            let sourcefile = pool
                .utf8(sourcefile_index)
                .ok_or_else(|| DecodeError::unresolved(sourcefile_index, "Utf8", index_offset))?;
            AttributeInfo::SourceFile {
                sourcefile_index,
                sourcefile: sourcefile.to_owned(),
            }
        }
        AttributeKind::LineNumberTable => {
            let entries_count = payload.read_u16()?;
            let mut entries = Vec::with_capacity(entries_count as usize);
            for _ in 0..entries_count {
                entries.push(LineNumberEntry {
                    start_pc: payload.read_u16()?,
                    line_number: payload.read_u16()?,
                });
            }
            AttributeInfo::LineNumberTable(entries)
        }
        _ => return Ok(AttributeInfo::Opaque { kind, length }),
    };

    if !payload.is_empty() {
        log::warn!(
            "{} attribute at offset {} has {} trailing bytes",
            kind.name(),
            offset,
            payload.remaining()
        );
    }
    Ok(attribute)
}

fn parse_code(payload: &mut BinaryCursor, pool: &ConstantPool) -> Result<CodeAttribute> {
    let max_stack = payload.read_u16()?;
    let max_locals = payload.read_u16()?;
    let code_length = payload.read_u32()?;
    let code = payload.read_exact(code_length as usize)?.to_vec();

    let exception_table_length = payload.read_u16()?;
    let mut exception_table = Vec::with_capacity(exception_table_length as usize);
    for _ in 0..exception_table_length {
        exception_table.push(ExceptionTableEntry {
            start_pc: payload.read_u16()?,
            end_pc: payload.read_u16()?,
            handler_pc: payload.read_u16()?,
            catch_type: payload.read_u16()?,
        });
    }

    // Nested attributes come from the Code payload only, never the outer stream.
    let attributes_count = payload.read_u16()?;
    let attributes = parse_attributes(payload, pool, attributes_count)?;

    Ok(CodeAttribute {
        max_stack,
        max_locals,
        code,
        exception_table,
        attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant_pool::CPInfo;
    use crate::test_utils::{attribute, code_payload};

    fn pool(names: &[&str]) -> ConstantPool {
        ConstantPool::from_entries(
            names
                .iter()
                .map(|name| {
                    Some(CPInfo::ConstantUtf8 {
                        bytes: name.to_string(),
                    })
                })
                .collect(),
        )
    }

    #[test]
    fn opaque_attributes_are_skipped_exactly() {
        let pool = pool(&["Signature", "SourceFile", "Main.java"]);
        let mut bytes = attribute(1, &[0xAA, 0xBB, 0xCC]);
        bytes.extend(attribute(2, &[0, 3]));

        let mut cursor = BinaryCursor::new(&bytes);
        let first = parse_attribute(&mut cursor, &pool).unwrap();
        assert_eq!(
            first,
            AttributeInfo::Opaque {
                kind: AttributeKind::Signature,
                length: 3
            }
        );
        assert_eq!(cursor.position(), 6 + 3);
        let second = parse_attribute(&mut cursor, &pool).unwrap();
        assert_eq!(
            second,
            AttributeInfo::SourceFile {
                sourcefile_index: 3,
                sourcefile: "Main.java".to_string()
            }
        );
        assert!(cursor.is_empty());
    }

    #[test]
    fn code_attribute_decodes_nested_line_numbers() {
        let pool = pool(&["Code", "LineNumberTable"]);
        let line_numbers = attribute(2, &[0, 2, 0, 0, 0, 3, 0, 4, 0, 5]);
        let payload = code_payload(2, 1, &[0x04, 0xB1], &[[0, 2, 1, 0]], &[line_numbers]);
        let bytes = attribute(1, &payload);

        let mut cursor = BinaryCursor::new(&bytes);
        let code = match parse_attribute(&mut cursor, &pool).unwrap() {
            AttributeInfo::Code(code) => code,
            other => panic!("expected Code, got {:?}", other),
        };
        assert!(cursor.is_empty());
        assert_eq!((code.max_stack, code.max_locals), (2, 1));
        assert_eq!(code.code, vec![0x04, 0xB1]);
        assert_eq!(
            code.exception_table,
            vec![ExceptionTableEntry {
                start_pc: 0,
                end_pc: 2,
                handler_pc: 1,
                catch_type: 0
            }]
        );
        assert_eq!(
            code.line_numbers().unwrap(),
            &[
                LineNumberEntry {
                    start_pc: 0,
                    line_number: 3
                },
                LineNumberEntry {
                    start_pc: 4,
                    line_number: 5
                }
            ]
        );
    }

    #[test]
    fn nested_count_cannot_escape_the_code_payload() {
        let pool = pool(&["Code", "Deprecated"]);
        // Claims two nested attributes but only carries one.
        let mut payload = code_payload(1, 1, &[0xB1], &[], &[attribute(2, &[])]);
        let count_at = payload.len() - 6 - 2;
        payload[count_at + 1] = 2;
        let mut bytes = attribute(1, &payload);
        // A valid attribute right after the Code attribute must not be read
        // as the missing nested one.
        bytes.extend(attribute(2, &[]));

        let mut cursor = BinaryCursor::new(&bytes);
        assert!(matches!(
            parse_attribute(&mut cursor, &pool),
            Err(DecodeError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn unknown_attribute_name_fails() {
        let pool = pool(&["Frobnicate"]);
        let bytes = attribute(1, &[]);
        match parse_attribute(&mut BinaryCursor::new(&bytes), &pool) {
            Err(DecodeError::UnknownAttribute { name, offset }) => {
                assert_eq!(name, "Frobnicate");
                assert_eq!(offset, 0);
            }
            other => panic!("expected UnknownAttribute, got {:?}", other),
        }
    }

    #[test]
    fn name_must_resolve_to_utf8() {
        let pool = ConstantPool::from_entries(vec![Some(CPInfo::ConstantInteger { value: 1 })]);
        let bytes = attribute(1, &[]);
        assert!(matches!(
            parse_attribute(&mut BinaryCursor::new(&bytes), &pool),
            Err(DecodeError::UnresolvedConstant {
                index: 1,
                expected: "Utf8",
                ..
            })
        ));
    }

    #[test]
    fn source_file_index_must_resolve_to_utf8() {
        let pool = pool(&["SourceFile"]);
        let bytes = attribute(1, &[0, 9]);
        assert!(matches!(
            parse_attribute(&mut BinaryCursor::new(&bytes), &pool),
            Err(DecodeError::UnresolvedConstant {
                index: 9,
                offset: Some(6),
                ..
            })
        ));
    }

    #[test]
    fn payload_shorter_than_declared_length_is_truncated() {
        let pool = pool(&["Synthetic"]);
        let mut bytes = attribute(1, &[1, 2, 3, 4]);
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(
            parse_attribute(&mut BinaryCursor::new(&bytes), &pool),
            Err(DecodeError::TruncatedInput {
                offset: 6,
                needed: 4,
                available: 3
            })
        ));
    }
}
