//! Field and method descriptor parsing.
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{DecodeError, Result};

lazy_static! {
    // `(params)return`, params may be empty.
    static ref METHOD_DESCRIPTOR: Regex = Regex::new(r"^\(([^)]*)\)(.+)$").unwrap();
}

/// Primitive types a descriptor can name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BaseTypeKind {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Void,
}

impl BaseTypeKind {
    /// Map a descriptor letter to its base type.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'B' => Some(Self::Byte),
            'C' => Some(Self::Char),
            'D' => Some(Self::Double),
            'F' => Some(Self::Float),
            'I' => Some(Self::Int),
            'J' => Some(Self::Long),
            'S' => Some(Self::Short),
            'Z' => Some(Self::Boolean),
            'V' => Some(Self::Void),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Double => "double",
            Self::Float => "float",
            Self::Int => "int",
            Self::Long => "long",
            Self::Short => "short",
            Self::Boolean => "boolean",
            Self::Void => "void",
        }
    }
}

/// A parsed field type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Base(BaseTypeKind),
    /// Object type, dot separated (`java.lang.String`).
    Object(String),
    Array(Box<Type>),
}

impl Type {
    /// Returns the size in local variable slots of a given type.
    pub fn size(&self) -> usize {
        match self {
            Self::Base(BaseTypeKind::Long | BaseTypeKind::Double) => 2,
            Self::Base(BaseTypeKind::Void) => 0,
            _ => 1,
        }
    }

    /// Number of array dimensions, 0 for non-array types.
    pub fn dimensions(&self) -> usize {
        match self {
            Self::Array(component) => 1 + component.dimensions(),
            _ => 0,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Base(kind) => write!(f, "{}", kind.name()),
            Self::Object(name) => write!(f, "{}", name),
            Self::Array(component) => write!(f, "{}[]", component),
        }
    }
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<Type>,
    pub return_type: Type,
}

impl MethodDescriptor {
    /// Render as `ReturnType name(Param1, Param2)`.
    pub fn signature(&self, name: &str) -> String {
        let params: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        format!("{} {}({})", self.return_type, name, params.join(", "))
    }

    /// Local variable slots taken by the parameters.
    pub fn param_slots(&self) -> usize {
        self.params.iter().map(Type::size).sum()
    }
}

/// Parse one field type starting at `*pos`, leaving `*pos` just past it.
pub fn parse_field_type(descriptor: &str, pos: &mut usize) -> Result<Type> {
    let bytes = descriptor.as_bytes();
    let start = *pos;
    let c = match bytes.get(start) {
        Some(c) => *c as char,
        None => return Err(DecodeError::descriptor(descriptor, start, "unexpected end")),
    };
    if let Some(kind) = BaseTypeKind::from_char(c) {
        *pos += 1;
        return Ok(Type::Base(kind));
    }
    match c {
        '[' => {
            *pos += 1;
            let component = parse_field_type(descriptor, pos)?;
            Ok(Type::Array(Box::new(component)))
        }
        'L' => {
            let end = match descriptor[start..].find(';') {
                Some(offset) => start + offset,
                None => {
                    return Err(DecodeError::descriptor(
                        descriptor,
                        start,
                        "unterminated object type",
                    ))
                }
            };
            let internal_name = &descriptor[start + 1..end];
            if internal_name.is_empty() {
                return Err(DecodeError::descriptor(descriptor, start, "empty class name"));
            }
            *pos = end + 1;
            Ok(Type::Object(internal_name.replace('/', ".")))
        }
        _ => Err(DecodeError::descriptor(descriptor, start, "unrecognized type character")),
    }
}

/// Parse a complete field descriptor such as `[[I`.
pub fn parse_field_descriptor(descriptor: &str) -> Result<Type> {
    let mut pos = 0;
    let field_type = parse_field_type(descriptor, &mut pos)?;
    if pos != descriptor.len() {
        return Err(DecodeError::descriptor(descriptor, pos, "trailing characters"));
    }
    Ok(field_type)
}

/// Parse a complete method descriptor such as `(II)V`.
pub fn parse_method_descriptor(descriptor: &str) -> Result<MethodDescriptor> {
    let caps = match METHOD_DESCRIPTOR.captures(descriptor) {
        Some(caps) => caps,
        None => {
            let position = if descriptor.starts_with('(') { descriptor.len() } else { 0 };
            return Err(DecodeError::descriptor(
                descriptor,
                position,
                "expected (parameters)return",
            ));
        }
    };
    let params_match = caps.get(1).map_or(1..1, |m| m.range());
    let return_match = caps.get(2).map_or(descriptor.len()..descriptor.len(), |m| m.range());

    let mut params = Vec::new();
    let mut pos = params_match.start;
    while pos < params_match.end {
        params.push(parse_field_type(descriptor, &mut pos)?);
    }
    if pos != params_match.end {
        return Err(DecodeError::descriptor(descriptor, pos, "parameter runs past ')'"));
    }

    let mut pos = return_match.start;
    let return_type = parse_field_type(descriptor, &mut pos)?;
    if pos != return_match.end {
        return Err(DecodeError::descriptor(descriptor, pos, "trailing characters"));
    }
    Ok(MethodDescriptor {
        params,
        return_type,
    })
}

/// Render a member for display: `void main(java.lang.String[])` for a
/// method descriptor, `int count` for a field descriptor.
pub fn format_descriptor(descriptor: &str, name: &str) -> Result<String> {
    if descriptor.starts_with('(') {
        Ok(parse_method_descriptor(descriptor)?.signature(name))
    } else {
        Ok(format!("{} {}", parse_field_descriptor(descriptor)?, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base_types() {
        assert_eq!(parse_field_descriptor("I").unwrap(), Type::Base(BaseTypeKind::Int));
        assert_eq!(parse_field_descriptor("S").unwrap().to_string(), "short");
        assert_eq!(parse_field_descriptor("Z").unwrap().to_string(), "boolean");
    }

    #[test]
    fn parses_arrays() {
        let t = parse_field_descriptor("[[I").unwrap();
        assert_eq!(t.dimensions(), 2);
        assert_eq!(t.to_string(), "int[][]");
    }

    #[test]
    fn parses_object_types() {
        let t = parse_field_descriptor("Ljava/lang/String;").unwrap();
        assert_eq!(t, Type::Object("java.lang.String".to_string()));
        assert_eq!(t.to_string(), "java.lang.String");
    }

    #[test]
    fn parse_field_type_advances_past_each_type() {
        let descriptor = "JLjava/lang/Object;[D";
        let mut pos = 0;
        assert_eq!(parse_field_type(descriptor, &mut pos).unwrap().to_string(), "long");
        assert_eq!(pos, 1);
        assert_eq!(
            parse_field_type(descriptor, &mut pos).unwrap().to_string(),
            "java.lang.Object"
        );
        assert_eq!(pos, 19);
        assert_eq!(parse_field_type(descriptor, &mut pos).unwrap().to_string(), "double[]");
        assert_eq!(pos, descriptor.len());
    }

    #[test]
    fn parses_method_descriptors() {
        let method = parse_method_descriptor("(II)V").unwrap();
        assert_eq!(method.params.len(), 2);
        assert_eq!(method.return_type, Type::Base(BaseTypeKind::Void));
        assert_eq!(method.signature("methodName"), "void methodName(int, int)");

        let main = parse_method_descriptor("([Ljava/lang/String;)V").unwrap();
        assert_eq!(main.signature("main"), "void main(java.lang.String[])");

        let mixed = parse_method_descriptor("(JLjava/lang/String;D)[I").unwrap();
        assert_eq!(mixed.param_slots(), 5);
        assert_eq!(mixed.signature("f"), "int[] f(long, java.lang.String, double)");

        assert_eq!(parse_method_descriptor("()Ljava/lang/Object;").unwrap().params, vec![]);
    }

    #[test]
    fn formats_fields_and_methods() {
        assert_eq!(format_descriptor("(I)I", "factorial").unwrap(), "int factorial(int)");
        assert_eq!(format_descriptor("[J", "values").unwrap(), "long[] values");
    }

    #[test]
    fn rejects_malformed_descriptors() {
        for bad in ["", "Q", "Ljava/lang/String", "[", "II", "L;"] {
            assert!(
                matches!(
                    parse_field_descriptor(bad),
                    Err(DecodeError::InvalidDescriptor { .. })
                ),
                "{:?} should be rejected",
                bad
            );
        }
        for bad in ["(I", "I)V", "(I)", "(Q)V", "(I)VV", "(Ljava/lang/String)V"] {
            assert!(
                matches!(
                    parse_method_descriptor(bad),
                    Err(DecodeError::InvalidDescriptor { .. })
                ),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
