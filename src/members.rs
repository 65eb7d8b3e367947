//! Field and method records.
use std::fmt;

use crate::attributes::{parse_attributes, AttributeInfo, CodeAttribute};
use crate::constant_pool::ConstantPool;
use crate::descriptor::{parse_field_descriptor, parse_method_descriptor, MethodDescriptor, Type};
use crate::error::{DecodeError, Result};
use crate::reader::BinaryCursor;

/// Access flags of a class, field or method.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AccessFlags(pub u16);

impl AccessFlags {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const SUPER: u16 = 0x0020;
    pub const VOLATILE: u16 = 0x0040;
    pub const TRANSIENT: u16 = 0x0080;
    pub const NATIVE: u16 = 0x0100;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const STRICT: u16 = 0x0800;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;

    const NAMES: [(u16, &'static str); 15] = [
        (Self::PUBLIC, "public"),
        (Self::PRIVATE, "private"),
        (Self::PROTECTED, "protected"),
        (Self::STATIC, "static"),
        (Self::FINAL, "final"),
        (Self::SUPER, "super"),
        (Self::VOLATILE, "volatile"),
        (Self::TRANSIENT, "transient"),
        (Self::NATIVE, "native"),
        (Self::INTERFACE, "interface"),
        (Self::ABSTRACT, "abstract"),
        (Self::STRICT, "strict"),
        (Self::SYNTHETIC, "synthetic"),
        (Self::ANNOTATION, "annotation"),
        (Self::ENUM, "enum"),
    ];

    pub fn contains(&self, flag: u16) -> bool {
        self.0 & flag == flag
    }

    pub fn bits(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join(" "))
    }
}

/// A field or method. Both share the same layout in the class file.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
    access_flags: AccessFlags,
    name_index: u16,
    name: String,
    descriptor_index: u16,
    attributes: Vec<AttributeInfo>,
}

pub type FieldInfo = MemberInfo;
pub type MethodInfo = MemberInfo;

impl MemberInfo {
    pub fn access_flags(&self) -> AccessFlags {
        self.access_flags
    }

    pub fn name_index(&self) -> u16 {
        self.name_index
    }

    /// Name resolved from the constant pool at decode time.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor_index(&self) -> u16 {
        self.descriptor_index
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    /// The Code attribute of a method.
    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.iter().find_map(|attribute| match attribute {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }

    /// Raw descriptor text.
    pub fn descriptor<'a>(&self, pool: &'a ConstantPool) -> Result<&'a str> {
        pool.utf8(self.descriptor_index)
            .ok_or_else(|| DecodeError::unresolved_index(self.descriptor_index, "Utf8"))
    }

    /// Parse the descriptor of a method.
    pub fn method_descriptor(&self, pool: &ConstantPool) -> Result<MethodDescriptor> {
        parse_method_descriptor(self.descriptor(pool)?)
    }

    /// Parse the descriptor of a field.
    pub fn field_type(&self, pool: &ConstantPool) -> Result<Type> {
        parse_field_descriptor(self.descriptor(pool)?)
    }
}

/// Decode one field or method record.
pub fn parse_member(cursor: &mut BinaryCursor, pool: &ConstantPool) -> Result<MemberInfo> {
    let access_flags = AccessFlags(cursor.read_u16()?);
    let name_offset = cursor.position();
    let name_index = cursor.read_u16()?;
    let name = pool
        .utf8(name_index)
        .ok_or_else(|| DecodeError::unresolved(name_index, "Utf8", name_offset))?
        .to_owned();
    let descriptor_index = cursor.read_u16()?;
    let attributes_count = cursor.read_u16()?;
    let attributes = parse_attributes(cursor, pool, attributes_count)?;
    Ok(MemberInfo {
        access_flags,
        name_index,
        name,
        descriptor_index,
        attributes,
    })
}

/// Decode `count` consecutive members.
pub fn parse_members(
    cursor: &mut BinaryCursor,
    pool: &ConstantPool,
    count: u16,
) -> Result<Vec<MemberInfo>> {
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        members.push(parse_member(cursor, pool)?);
    }
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant_pool::CPInfo;
    use crate::test_utils::{attribute, code_payload};

    fn pool() -> ConstantPool {
        let names = ["main", "([Ljava/lang/String;)V", "Code", "count", "I", "Deprecated"];
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
    fn decodes_a_method_with_code() {
        let pool = pool();
        let mut bytes = vec![0x00, 0x09, 0, 1, 0, 2, 0, 1];
        bytes.extend(attribute(3, &code_payload(0, 1, &[0xB1], &[], &[])));

        let mut cursor = BinaryCursor::new(&bytes);
        let method = parse_member(&mut cursor, &pool).unwrap();
        assert!(cursor.is_empty());
        assert_eq!(method.name(), "main");
        assert_eq!(method.access_flags().to_string(), "public static");
        assert_eq!(method.descriptor(&pool).unwrap(), "([Ljava/lang/String;)V");
        assert_eq!(
            method.method_descriptor(&pool).unwrap().signature(method.name()),
            "void main(java.lang.String[])"
        );
        assert_eq!(method.code().unwrap().code, vec![0xB1]);
    }

    #[test]
    fn decodes_consecutive_fields() {
        let pool = pool();
        let mut bytes = vec![0x00, 0x02, 0, 4, 0, 5, 0, 1];
        bytes.extend(attribute(6, &[]));
        bytes.extend([0x00, 0x18, 0, 4, 0, 5, 0, 0]);

        let fields = parse_members(&mut BinaryCursor::new(&bytes), &pool, 2).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field_type(&pool).unwrap().to_string(), "int");
        assert_eq!(fields[0].attributes().len(), 1);
        assert!(fields[0].code().is_none());
        assert!(fields[1].access_flags().contains(AccessFlags::STATIC | AccessFlags::FINAL));
    }

    #[test]
    fn member_name_must_be_utf8() {
        let pool = pool();
        let bytes = [0, 0, 0, 42, 0, 2, 0, 0];
        assert!(matches!(
            parse_member(&mut BinaryCursor::new(&bytes), &pool),
            Err(DecodeError::UnresolvedConstant {
                index: 42,
                offset: Some(2),
                ..
            })
        ));
    }
}
