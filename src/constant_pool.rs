//! Constant pool entries and the decoder that builds the pool.
use crate::config::{DecodeOptions, PoolSlotPolicy, TextPolicy};
use crate::error::{DecodeError, Result};
use crate::reader::BinaryCursor;

pub const CONSTANT_UTF8: u8 = 1;
pub const CONSTANT_INTEGER: u8 = 3;
pub const CONSTANT_FLOAT: u8 = 4;
pub const CONSTANT_LONG: u8 = 5;
pub const CONSTANT_DOUBLE: u8 = 6;
pub const CONSTANT_CLASS: u8 = 7;
pub const CONSTANT_STRING: u8 = 8;
pub const CONSTANT_FIELD_REF: u8 = 9;
pub const CONSTANT_METHOD_REF: u8 = 10;
pub const CONSTANT_INTERFACE_METHOD_REF: u8 = 11;
pub const CONSTANT_NAME_AND_TYPE: u8 = 12;
pub const CONSTANT_METHOD_HANDLE: u8 = 15;
pub const CONSTANT_METHOD_TYPE: u8 = 16;
pub const CONSTANT_INVOKE_DYNAMIC: u8 = 18;

/// A single constant pool entry. Every `*_index` field is a 1-based index
/// into the same pool and is only resolved when it is used.
#[derive(Debug, Clone, PartialEq)]
pub enum CPInfo {
    ConstantClass {
        name_index: u16,
    },
    ConstantFieldRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    ConstantMethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    ConstantInterfaceMethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    ConstantString {
        string_index: u16,
    },
    ConstantInteger {
        value: i32,
    },
    ConstantFloat {
        value: f32,
    },
    ConstantLong {
        value: i64,
    },
    ConstantDouble {
        value: f64,
    },
    ConstantNameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    ConstantUtf8 {
        bytes: String,
    },
    ConstantMethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    ConstantMethodType {
        descriptor_index: u16,
    },
    ConstantInvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
}

impl CPInfo {
    /// Returns the tag byte this entry is encoded with.
    pub fn tag(&self) -> u8 {
        match self {
            Self::ConstantClass { .. } => CONSTANT_CLASS,
            Self::ConstantFieldRef { .. } => CONSTANT_FIELD_REF,
            Self::ConstantMethodRef { .. } => CONSTANT_METHOD_REF,
            Self::ConstantInterfaceMethodRef { .. } => CONSTANT_INTERFACE_METHOD_REF,
            Self::ConstantString { .. } => CONSTANT_STRING,
            Self::ConstantInteger { .. } => CONSTANT_INTEGER,
            Self::ConstantFloat { .. } => CONSTANT_FLOAT,
            Self::ConstantLong { .. } => CONSTANT_LONG,
            Self::ConstantDouble { .. } => CONSTANT_DOUBLE,
            Self::ConstantNameAndType { .. } => CONSTANT_NAME_AND_TYPE,
            Self::ConstantUtf8 { .. } => CONSTANT_UTF8,
            Self::ConstantMethodHandle { .. } => CONSTANT_METHOD_HANDLE,
            Self::ConstantMethodType { .. } => CONSTANT_METHOD_TYPE,
            Self::ConstantInvokeDynamic { .. } => CONSTANT_INVOKE_DYNAMIC,
        }
    }

    /// Human readable kind name, as used in dumps and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConstantClass { .. } => "Class",
            Self::ConstantFieldRef { .. } => "Fieldref",
            Self::ConstantMethodRef { .. } => "Methodref",
            Self::ConstantInterfaceMethodRef { .. } => "InterfaceMethodref",
            Self::ConstantString { .. } => "String",
            Self::ConstantInteger { .. } => "Integer",
            Self::ConstantFloat { .. } => "Float",
            Self::ConstantLong { .. } => "Long",
            Self::ConstantDouble { .. } => "Double",
            Self::ConstantNameAndType { .. } => "NameAndType",
            Self::ConstantUtf8 { .. } => "Utf8",
            Self::ConstantMethodHandle { .. } => "MethodHandle",
            Self::ConstantMethodType { .. } => "MethodType",
            Self::ConstantInvokeDynamic { .. } => "InvokeDynamic",
        }
    }

    /// Long and Double are the 8-byte constants.
    pub fn is_wide(&self) -> bool {
        matches!(self, Self::ConstantLong { .. } | Self::ConstantDouble { .. })
    }
}

/// Symbolic reference to a field or method, resolved down to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub class_name: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// The constant pool of a class file.
///
/// Slot 0 is never populated so the pool can be addressed with the 1-based
/// indices found in the file. Slots reserved after an 8-byte constant are
/// empty as well.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantPool {
    entries: Vec<Option<CPInfo>>,
}

impl ConstantPool {
    /// Build a pool from entries listed in index order starting at 1.
    pub fn from_entries(entries: Vec<Option<CPInfo>>) -> Self {
        let mut slots = Vec::with_capacity(entries.len() + 1);
        slots.push(None);
        slots.extend(entries);
        Self { entries: slots }
    }

    pub fn get(&self, index: u16) -> Option<&CPInfo> {
        self.entries.get(index as usize).and_then(Option::as_ref)
    }

    /// Number of slots, counting the unused slot 0. This is the value of the
    /// pool count field for a well formed pool.
    pub fn slot_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of populated entries.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over populated entries with their index.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &CPInfo)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_ref().map(|entry| (index as u16, entry)))
    }

    pub fn utf8(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            CPInfo::ConstantUtf8 { bytes } => Some(bytes),
            _ => None,
        }
    }

    /// Internal (slash separated) name of a Class entry.
    pub fn class_name(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            CPInfo::ConstantClass { name_index } => self.utf8(*name_index),
            _ => None,
        }
    }

    /// Text of a String entry.
    pub fn string(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            CPInfo::ConstantString { string_index } => self.utf8(*string_index),
            _ => None,
        }
    }

    /// Name and descriptor of a NameAndType entry.
    pub fn name_and_type(&self, index: u16) -> Option<(&str, &str)> {
        match self.get(index)? {
            CPInfo::ConstantNameAndType {
                name_index,
                descriptor_index,
            } => Some((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => None,
        }
    }

    /// Resolve a Fieldref, Methodref or InterfaceMethodref entry.
    pub fn member_ref(&self, index: u16) -> Option<MemberRef<'_>> {
        let (class_index, name_and_type_index) = match self.get(index)? {
            CPInfo::ConstantFieldRef {
                class_index,
                name_and_type_index,
            }
            | CPInfo::ConstantMethodRef {
                class_index,
                name_and_type_index,
            }
            | CPInfo::ConstantInterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index),
            _ => return None,
        };
        let (name, descriptor) = self.name_and_type(name_and_type_index)?;
        Some(MemberRef {
            class_name: self.class_name(class_index)?,
            name,
            descriptor,
        })
    }
}

/// Decode the constant pool. `count` is the raw pool count field, which is
/// one more than the number of slots the pool numbers (1..count).
pub fn parse_constant_pool(
    cursor: &mut BinaryCursor,
    count: u16,
    options: &DecodeOptions,
) -> Result<ConstantPool> {
    let mut entries: Vec<Option<CPInfo>> = Vec::with_capacity(count as usize);
    entries.push(None);

    let mut index: u16 = 1;
    while index < count {
        let constant = parse_constant(cursor, index, options)?;
        let wide = constant.is_wide();
        entries.push(Some(constant));
        index += 1;
        if wide && options.pool_slots == PoolSlotPolicy::Wide && index < count {
            entries.push(None);
            index += 1;
        }
    }

    log::debug!(
        "constant pool: {} slots, {} entries",
        entries.len(),
        entries.iter().flatten().count()
    );
    Ok(ConstantPool { entries })
}

/// Decode the entry numbered `index`, starting at its tag byte.
pub fn parse_constant(
    cursor: &mut BinaryCursor,
    index: u16,
    options: &DecodeOptions,
) -> Result<CPInfo> {
    let offset = cursor.position();
    let tag = cursor.read_u8()?;
    let constant = match tag {
        CONSTANT_UTF8 => {
            let length = cursor.read_u16()?;
            let text_offset = cursor.position();
            let raw = cursor.read_exact(length as usize)?;
            let bytes = decode_text(raw, options.text).ok_or(DecodeError::InvalidText {
                index,
                offset: text_offset,
            })?;
            CPInfo::ConstantUtf8 { bytes }
        }
        CONSTANT_INTEGER => CPInfo::ConstantInteger {
            value: cursor.read_i32()?,
        },
        CONSTANT_FLOAT => CPInfo::ConstantFloat {
            value: f32::from_bits(cursor.read_u32()?),
        },
        CONSTANT_LONG => CPInfo::ConstantLong {
            value: read_wide(cursor)? as i64,
        },
        CONSTANT_DOUBLE => CPInfo::ConstantDouble {
            value: f64::from_bits(read_wide(cursor)?),
        },
        CONSTANT_CLASS => CPInfo::ConstantClass {
            name_index: cursor.read_u16()?,
        },
        CONSTANT_STRING => CPInfo::ConstantString {
            string_index: cursor.read_u16()?,
        },
        CONSTANT_FIELD_REF => CPInfo::ConstantFieldRef {
            class_index: cursor.read_u16()?,
            name_and_type_index: cursor.read_u16()?,
        },
        CONSTANT_METHOD_REF => CPInfo::ConstantMethodRef {
            class_index: cursor.read_u16()?,
            name_and_type_index: cursor.read_u16()?,
        },
        CONSTANT_INTERFACE_METHOD_REF => CPInfo::ConstantInterfaceMethodRef {
            class_index: cursor.read_u16()?,
            name_and_type_index: cursor.read_u16()?,
        },
        CONSTANT_NAME_AND_TYPE => CPInfo::ConstantNameAndType {
            name_index: cursor.read_u16()?,
            descriptor_index: cursor.read_u16()?,
        },
        CONSTANT_METHOD_HANDLE => CPInfo::ConstantMethodHandle {
            reference_kind: cursor.read_u8()?,
            reference_index: cursor.read_u16()?,
        },
        CONSTANT_METHOD_TYPE => CPInfo::ConstantMethodType {
            descriptor_index: cursor.read_u16()?,
        },
        CONSTANT_INVOKE_DYNAMIC => CPInfo::ConstantInvokeDynamic {
            bootstrap_method_attr_index: cursor.read_u16()?,
            name_and_type_index: cursor.read_u16()?,
        },
        _ => return Err(DecodeError::UnknownConstantTag { tag, index, offset }),
    };
    Ok(constant)
}

// 8-byte constants are stored as two big-endian u32 halves, high first.
fn read_wide(cursor: &mut BinaryCursor) -> Result<u64> {
    let high = cursor.read_u32()? as u64;
    let low = cursor.read_u32()? as u64;
    Ok((high << 32) | low)
}

/// Decode Utf8 constant bytes according to `policy`.
pub fn decode_text(raw: &[u8], policy: TextPolicy) -> Option<String> {
    if let Ok(text) = std::str::from_utf8(raw) {
        return Some(text.to_owned());
    }
    if let Some(text) = decode_modified_utf8(raw) {
        return Some(text);
    }
    match policy {
        TextPolicy::Strict => None,
        TextPolicy::Lossy => Some(String::from_utf8_lossy(raw).into_owned()),
    }
}

// Modified UTF-8 encodes NUL as C0 80 and supplementary characters as two
// 3-byte surrogates, so it is decoded to UTF-16 units first.
fn decode_modified_utf8(raw: &[u8]) -> Option<String> {
    let mut units: Vec<u16> = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b0 = raw[i];
        match b0 {
            0x01..=0x7F => {
                units.push(b0 as u16);
                i += 1;
            }
            0xC0..=0xDF => {
                let b1 = continuation(raw, i + 1)?;
                units.push(((b0 as u16 & 0x1F) << 6) | b1);
                i += 2;
            }
            0xE0..=0xEF => {
                let b1 = continuation(raw, i + 1)?;
                let b2 = continuation(raw, i + 2)?;
                units.push(((b0 as u16 & 0x0F) << 12) | (b1 << 6) | b2);
                i += 3;
            }
            _ => return None,
        }
    }
    String::from_utf16(&units).ok()
}

fn continuation(raw: &[u8], at: usize) -> Option<u16> {
    match raw.get(at) {
        Some(byte) if byte & 0xC0 == 0x80 => Some((byte & 0x3F) as u16),
        _ => None,
    }
}
