//! Builders for synthetic class files used by the tests.
use crate::constant_pool::{
    CONSTANT_CLASS, CONSTANT_DOUBLE, CONSTANT_FIELD_REF, CONSTANT_FLOAT, CONSTANT_INTEGER,
    CONSTANT_LONG, CONSTANT_METHOD_REF, CONSTANT_NAME_AND_TYPE, CONSTANT_STRING, CONSTANT_UTF8,
};
use crate::jvm::MAGIC;

/// Encode an attribute record: name index, u32 length, payload.
pub fn attribute(name_index: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(6 + payload.len());
    bytes.extend(name_index.to_be_bytes());
    bytes.extend((payload.len() as u32).to_be_bytes());
    bytes.extend(payload);
    bytes
}

/// Encode the payload of a Code attribute. `attributes` are already encoded
/// nested attribute records.
pub fn code_payload(
    max_stack: u16,
    max_locals: u16,
    code: &[u8],
    exception_table: &[[u16; 4]],
    attributes: &[Vec<u8>],
) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend(max_stack.to_be_bytes());
    bytes.extend(max_locals.to_be_bytes());
    bytes.extend((code.len() as u32).to_be_bytes());
    bytes.extend(code);
    bytes.extend((exception_table.len() as u16).to_be_bytes());
    for entry in exception_table {
        for value in entry {
            bytes.extend(value.to_be_bytes());
        }
    }
    bytes.extend((attributes.len() as u16).to_be_bytes());
    for attribute in attributes {
        bytes.extend(attribute);
    }
    bytes
}

/// Assembles a class file with a constant pool laid out the way compilers
/// do it (Long and Double take two slots).
pub struct ClassFileBuilder {
    pool: Vec<u8>,
    next_index: u16,
    code_name: Option<u16>,
    source_file_name: Option<u16>,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<Vec<u8>>,
}

impl ClassFileBuilder {
    /// Start a public class named `this_class` extending `java/lang/Object`.
    pub fn new(this_class: &str) -> Self {
        let mut builder = Self {
            pool: Vec::new(),
            next_index: 1,
            code_name: None,
            source_file_name: None,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        };
        builder.this_class = builder.class(this_class);
        builder.super_class = builder.class("java/lang/Object");
        builder
    }

    fn push(&mut self, bytes: &[u8], slots: u16) -> u16 {
        let index = self.next_index;
        self.pool.extend(bytes);
        self.next_index += slots;
        index
    }

    pub fn utf8(&mut self, text: &str) -> u16 {
        let mut bytes = vec![CONSTANT_UTF8];
        bytes.extend((text.len() as u16).to_be_bytes());
        bytes.extend(text.as_bytes());
        self.push(&bytes, 1)
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        let mut bytes = vec![CONSTANT_CLASS];
        bytes.extend(name_index.to_be_bytes());
        self.push(&bytes, 1)
    }

    pub fn string(&mut self, text: &str) -> u16 {
        let string_index = self.utf8(text);
        let mut bytes = vec![CONSTANT_STRING];
        bytes.extend(string_index.to_be_bytes());
        self.push(&bytes, 1)
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        let mut bytes = vec![CONSTANT_INTEGER];
        bytes.extend(value.to_be_bytes());
        self.push(&bytes, 1)
    }

    pub fn float(&mut self, value: f32) -> u16 {
        let mut bytes = vec![CONSTANT_FLOAT];
        bytes.extend(value.to_bits().to_be_bytes());
        self.push(&bytes, 1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        let mut bytes = vec![CONSTANT_LONG];
        bytes.extend(value.to_be_bytes());
        self.push(&bytes, 2)
    }

    pub fn double(&mut self, value: f64) -> u16 {
        let mut bytes = vec![CONSTANT_DOUBLE];
        bytes.extend(value.to_bits().to_be_bytes());
        self.push(&bytes, 2)
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.name_and_type_at(name_index, descriptor_index)
    }

    /// NameAndType entry over raw indices, resolvable or not.
    pub fn name_and_type_at(&mut self, name_index: u16, descriptor_index: u16) -> u16 {
        let mut bytes = vec![CONSTANT_NAME_AND_TYPE];
        bytes.extend(name_index.to_be_bytes());
        bytes.extend(descriptor_index.to_be_bytes());
        self.push(&bytes, 1)
    }

    fn member_ref(&mut self, tag: u8, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.member_ref_at(tag, class_index, name_and_type_index)
    }

    fn member_ref_at(&mut self, tag: u8, class_index: u16, name_and_type_index: u16) -> u16 {
        let mut bytes = vec![tag];
        bytes.extend(class_index.to_be_bytes());
        bytes.extend(name_and_type_index.to_be_bytes());
        self.push(&bytes, 1)
    }

    /// Fieldref entry over raw indices, resolvable or not.
    pub fn field_ref_at(&mut self, class_index: u16, name_and_type_index: u16) -> u16 {
        self.member_ref_at(CONSTANT_FIELD_REF, class_index, name_and_type_index)
    }

    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(CONSTANT_FIELD_REF, class, name, descriptor)
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(CONSTANT_METHOD_REF, class, name, descriptor)
    }

    /// `System.out`, the output stream the interpreter knows about.
    pub fn system_out(&mut self) -> u16 {
        self.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;")
    }

    /// `PrintStream.println` taking a single argument of `descriptor` type.
    pub fn println(&mut self, argument: &str) -> u16 {
        let descriptor = format!("({})V", argument);
        self.method_ref("java/io/PrintStream", "println", &descriptor)
    }

    pub fn interface(&mut self, name: &str) -> &mut Self {
        let index = self.class(name);
        self.interfaces.push(index);
        self
    }

    /// Record an interface index verbatim, resolvable or not.
    pub fn interface_index(&mut self, index: u16) -> &mut Self {
        self.interfaces.push(index);
        self
    }

    pub fn field(&mut self, access_flags: u16, name: &str, descriptor: &str) -> &mut Self {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut bytes = Vec::new();
        bytes.extend(access_flags.to_be_bytes());
        bytes.extend(name_index.to_be_bytes());
        bytes.extend(descriptor_index.to_be_bytes());
        bytes.extend(0u16.to_be_bytes());
        self.fields.push(bytes);
        self
    }

    /// Add a method whose only attribute is a Code attribute over `code`.
    pub fn method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
    ) -> &mut Self {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let code_name = match self.code_name {
            Some(index) => index,
            None => {
                let index = self.utf8("Code");
                self.code_name = Some(index);
                index
            }
        };
        let mut bytes = Vec::new();
        bytes.extend(access_flags.to_be_bytes());
        bytes.extend(name_index.to_be_bytes());
        bytes.extend(descriptor_index.to_be_bytes());
        bytes.extend(1u16.to_be_bytes());
        bytes.extend(attribute(
            code_name,
            &code_payload(max_stack, max_locals, code, &[], &[]),
        ));
        self.methods.push(bytes);
        self
    }

    /// Add a method without any attributes, like an abstract or native one.
    pub fn declare_method(&mut self, access_flags: u16, name: &str, descriptor: &str) -> &mut Self {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut bytes = Vec::new();
        bytes.extend(access_flags.to_be_bytes());
        bytes.extend(name_index.to_be_bytes());
        bytes.extend(descriptor_index.to_be_bytes());
        bytes.extend(0u16.to_be_bytes());
        self.methods.push(bytes);
        self
    }

    pub fn source_file(&mut self, name: &str) -> &mut Self {
        let attribute_name = match self.source_file_name {
            Some(index) => index,
            None => {
                let index = self.utf8("SourceFile");
                self.source_file_name = Some(index);
                index
            }
        };
        let file_name = self.utf8(name);
        self.attributes
            .push(attribute(attribute_name, &file_name.to_be_bytes()));
        self
    }

    /// Add an already encoded top-level attribute.
    pub fn raw_attribute(&mut self, bytes: Vec<u8>) -> &mut Self {
        self.attributes.push(bytes);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(MAGIC.to_be_bytes());
        bytes.extend(0u16.to_be_bytes());
        bytes.extend(52u16.to_be_bytes());
        bytes.extend(self.next_index.to_be_bytes());
        bytes.extend(&self.pool);
        bytes.extend(0x0021u16.to_be_bytes());
        bytes.extend(self.this_class.to_be_bytes());
        bytes.extend(self.super_class.to_be_bytes());
        bytes.extend((self.interfaces.len() as u16).to_be_bytes());
        for interface in &self.interfaces {
            bytes.extend(interface.to_be_bytes());
        }
        for members in [&self.fields, &self.methods, &self.attributes] {
            bytes.extend((members.len() as u16).to_be_bytes());
            for member in members {
                bytes.extend(member);
            }
        }
        bytes
    }
}
