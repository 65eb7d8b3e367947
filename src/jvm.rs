//! Lightweight implementation of a parser and decoder for JVM bytecode
//! class files.
use std::fs;
use std::path::Path;

use crate::attributes::{parse_attributes, AttributeInfo};
use crate::config::DecodeOptions;
use crate::constant_pool::{parse_constant_pool, ConstantPool};
use crate::error::{DecodeError, Result};
use crate::members::{parse_members, AccessFlags, FieldInfo, MethodInfo};
use crate::reader::BinaryCursor;

/// Every class file starts with this sentinel.
pub const MAGIC: u32 = 0xCAFEBABE;

/// A decoded class file. Built once by `JVMParser` and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    minor_version: u16,
    major_version: u16,
    constant_pool: ConstantPool,
    access_flags: AccessFlags,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<FieldInfo>,
    methods: Vec<MethodInfo>,
    attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    /// Version as `major.minor`.
    pub fn version(&self) -> String {
        format!("{}.{}", self.major_version, self.minor_version)
    }

    pub fn minor_version(&self) -> u16 {
        self.minor_version
    }

    pub fn major_version(&self) -> u16 {
        self.major_version
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.constant_pool
    }

    pub fn access_flags(&self) -> AccessFlags {
        self.access_flags
    }

    pub fn this_class(&self) -> u16 {
        self.this_class
    }

    pub fn super_class(&self) -> u16 {
        self.super_class
    }

    pub fn interfaces(&self) -> &[u16] {
        &self.interfaces
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    /// Internal name of this class, if `this_class` resolves.
    pub fn this_class_name(&self) -> Option<&str> {
        self.constant_pool.class_name(self.this_class)
    }

    /// Internal name of the super class. `java/lang/Object` has none.
    pub fn super_class_name(&self) -> Option<&str> {
        self.constant_pool.class_name(self.super_class)
    }

    /// Name recorded by the SourceFile attribute.
    pub fn source_file(&self) -> Option<&str> {
        self.attributes.iter().find_map(|attribute| match attribute {
            AttributeInfo::SourceFile { sourcefile, .. } => Some(sourcefile.as_str()),
            _ => None,
        })
    }

    /// First method with the given name.
    pub fn find_method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|method| method.name() == name)
    }
}

/// `JVMParser` decodes a class file image front to back, failing on the
/// first error.
pub struct JVMParser;

impl JVMParser {
    /// Parse with the default options.
    pub fn parse(bytes: &[u8]) -> Result<ClassFile> {
        Self::parse_with(bytes, &DecodeOptions::default())
    }

    pub fn parse_with(bytes: &[u8], options: &DecodeOptions) -> Result<ClassFile> {
        let mut cursor = BinaryCursor::new(bytes);

        let magic = cursor.read_u32()?;
        if magic != MAGIC {
            return Err(DecodeError::BadMagic { found: magic });
        }
        let minor_version = cursor.read_u16()?;
        let major_version = cursor.read_u16()?;
        log::debug!("class file version {}.{}", major_version, minor_version);

        let constant_pool_count = cursor.read_u16()?;
        let constant_pool = parse_constant_pool(&mut cursor, constant_pool_count, options)?;

        let access_flags = AccessFlags(cursor.read_u16()?);
        let this_class = cursor.read_u16()?;
        let super_class = cursor.read_u16()?;

        let interfaces_count = cursor.read_u16()?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            interfaces.push(cursor.read_u16()?);
        }

        let fields_count = cursor.read_u16()?;
        let fields = parse_members(&mut cursor, &constant_pool, fields_count)?;
        let methods_count = cursor.read_u16()?;
        let methods = parse_members(&mut cursor, &constant_pool, methods_count)?;
        let attributes_count = cursor.read_u16()?;
        let attributes = parse_attributes(&mut cursor, &constant_pool, attributes_count)?;
        log::debug!(
            "decoded {} interfaces, {} fields, {} methods, {} attributes",
            interfaces.len(),
            fields.len(),
            methods.len(),
            attributes.len()
        );
        if !cursor.is_empty() {
            log::warn!("{} trailing bytes after class file", cursor.remaining());
        }

        Ok(ClassFile {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }
}

/// Read a whole class file into memory.
pub fn read_class_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeKind;
    use crate::config::PoolSlotPolicy;
    use crate::constant_pool::CPInfo;
    use crate::test_utils::ClassFileBuilder;

    fn sample() -> Vec<u8> {
        let mut builder = ClassFileBuilder::new("demo/Main");
        builder.interface("java/lang/Runnable");
        builder.field(0x0002, "count", "I");
        builder.method(0x0009, "main", "([Ljava/lang/String;)V", 2, 2, &[0x05, 0x3C, 0xB1]);
        builder.source_file("Main.java");
        builder.build()
    }

    #[test]
    fn can_decode_a_class_file() {
        let class_file = JVMParser::parse(&sample()).unwrap();
        assert_eq!(class_file.version(), "52.0");
        assert_eq!(class_file.this_class_name(), Some("demo/Main"));
        assert_eq!(class_file.super_class_name(), Some("java/lang/Object"));
        assert_eq!(class_file.access_flags().to_string(), "public super");
        assert_eq!(class_file.interfaces().len(), 1);
        assert_eq!(
            class_file.constant_pool().class_name(class_file.interfaces()[0]),
            Some("java/lang/Runnable")
        );
        assert_eq!(class_file.fields()[0].name(), "count");
        assert_eq!(class_file.source_file(), Some("Main.java"));
        assert_eq!(class_file.attributes()[0].kind(), AttributeKind::SourceFile);

        let main = class_file.find_method("main").unwrap();
        let code = main.code().unwrap();
        assert_eq!(code.max_locals, 2);
        assert_eq!(code.code, vec![0x05, 0x3C, 0xB1]);
        assert!(class_file.find_method("missing").is_none());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = sample();
        bytes[3] = 0xBF;
        assert!(matches!(
            JVMParser::parse(&bytes),
            Err(DecodeError::BadMagic { found: 0xCAFEBABF })
        ));
    }

    #[test]
    fn partial_magic_is_truncated_input() {
        assert!(matches!(
            JVMParser::parse(&[0xCA, 0xFE, 0xBA]),
            Err(DecodeError::TruncatedInput {
                offset: 0,
                needed: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn every_truncation_fails_cleanly() {
        let bytes = sample();
        for len in 0..bytes.len() {
            match JVMParser::parse(&bytes[..len]) {
                Err(DecodeError::TruncatedInput { .. }) => {}
                other => panic!("prefix of {} bytes gave {:?}", len, other),
            }
        }
    }

    #[test]
    fn interfaces_are_not_resolved_at_decode_time() {
        let mut builder = ClassFileBuilder::new("Main");
        builder.interface_index(999);
        let class_file = JVMParser::parse(&builder.build()).unwrap();
        assert_eq!(class_file.interfaces(), &[999]);
    }

    #[test]
    fn slot_policy_changes_later_indices() {
        let mut builder = ClassFileBuilder::new("Main");
        let long = builder.long(7);
        let after = builder.utf8("after");
        let bytes = builder.build();

        let wide = JVMParser::parse(&bytes).unwrap();
        assert_eq!(wide.constant_pool().get(long), Some(&CPInfo::ConstantLong { value: 7 }));
        assert_eq!(wide.constant_pool().utf8(after), Some("after"));

        // Re-read as single slot: the pool count in the file is now one too
        // large, so the decoder runs into the access flags as a constant tag.
        let options = DecodeOptions::default().with_pool_slots(PoolSlotPolicy::Single);
        assert!(JVMParser::parse_with(&bytes, &options).is_err());
    }
}
