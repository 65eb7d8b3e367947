//! Abstract representation of a Java program: a decoded class file and the
//! method execution starts from.
use std::io::{self, Write};
use std::path::Path;

use crate::attributes::CodeAttribute;
use crate::config::DecodeOptions;
use crate::error::{DecodeError, Result};
use crate::jvm::{read_class_file, ClassFile, JVMParser};
use crate::members::MethodInfo;
use crate::runtime::{Execution, Runtime};

/// Name of the method a program starts from.
pub const ENTRY_POINT: &str = "main";

/// Representation of Java programs that we want to run.
#[derive(Debug, Clone)]
pub struct Program {
    class_file: ClassFile,
    // Index of the entry point in the class file's method table.
    entry_point: usize,
    code: CodeAttribute,
}

impl Program {
    /// Read, decode and validate the class file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, &DecodeOptions::default())
    }

    pub fn load_with(path: &Path, options: &DecodeOptions) -> Result<Self> {
        let bytes = read_class_file(path)?;
        log::debug!("read {} bytes from {}", bytes.len(), path.display());
        Self::from_bytes(&bytes, options)
    }

    pub fn from_bytes(bytes: &[u8], options: &DecodeOptions) -> Result<Self> {
        Self::new(JVMParser::parse_with(bytes, options)?)
    }

    /// Build a program from a decoded class file. Fails if the class has no
    /// `main` method or if `main` has no Code attribute. Overloads are not
    /// told apart: the first method named `main` is the entry point.
    pub fn new(class_file: ClassFile) -> Result<Self> {
        let entry_point = class_file
            .methods()
            .iter()
            .position(|method| method.name() == ENTRY_POINT)
            .ok_or_else(|| DecodeError::MissingMethod {
                name: ENTRY_POINT.to_owned(),
            })?;
        let code = class_file.methods()[entry_point]
            .code()
            .cloned()
            .ok_or_else(|| DecodeError::MissingCode {
                method: ENTRY_POINT.to_owned(),
            })?;
        Ok(Self {
            class_file,
            entry_point,
            code,
        })
    }

    pub fn class_file(&self) -> &ClassFile {
        &self.class_file
    }

    /// Returns the method execution starts from.
    pub fn entry_point(&self) -> &MethodInfo {
        &self.class_file.methods()[self.entry_point]
    }

    pub fn code(&self) -> &CodeAttribute {
        &self.code
    }

    /// Java style signature of the entry point, `void main(java.lang.String[])`.
    pub fn signature(&self) -> Result<String> {
        let method = self.entry_point();
        Ok(method
            .method_descriptor(self.class_file.constant_pool())?
            .signature(method.name()))
    }

    /// Run the entry point, collecting output and diagnostics.
    pub fn execute(&self) -> Execution {
        self.announce();
        Runtime::new(&self.class_file).execute(&self.code)
    }

    /// Run the entry point, streaming output to `out` and diagnostics to
    /// `err`.
    pub fn run<O: Write, E: Write>(&self, out: &mut O, err: &mut E) -> io::Result<Execution> {
        self.announce();
        Runtime::new(&self.class_file).run(&self.code, out, err)
    }

    // Goes to the log. The output stream only carries what the program prints.
    fn announce(&self) {
        match self.signature() {
            Ok(signature) => log::info!("Running {}", signature),
            Err(error) => log::info!("Running {} ({})", ENTRY_POINT, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ClassFileBuilder;

    #[test]
    fn can_build_program() {
        let mut builder = ClassFileBuilder::new("Factorial");
        builder.method(0x0001, "<init>", "()V", 1, 1, &[0x2A, 0xB7, 0x00, 0x01, 0xB1]);
        builder.method(0x0009, "main", "([Ljava/lang/String;)V", 2, 2, &[0x10, 0x0C, 0x3C, 0xB1]);
        let program = Program::from_bytes(&builder.build(), &DecodeOptions::default()).unwrap();

        assert_eq!(program.entry_point().name(), "main");
        assert_eq!(program.code().code, vec![0x10, 0x0C, 0x3C, 0xB1]);
        assert_eq!(program.signature().unwrap(), "void main(java.lang.String[])");
        assert_eq!(program.class_file().methods().len(), 2);

        let execution = program.execute();
        assert!(execution.halted);
        assert!(execution.diagnostics.is_empty());
    }

    #[test]
    fn first_main_is_the_entry_point() {
        let mut builder = ClassFileBuilder::new("Overloads");
        builder.method(0x0009, "main", "([Ljava/lang/String;)V", 1, 1, &[0x04, 0xB1]);
        builder.method(0x0009, "main", "()V", 1, 1, &[0x05, 0xB1]);
        let program = Program::from_bytes(&builder.build(), &DecodeOptions::default()).unwrap();

        assert_eq!(program.code().code, vec![0x04, 0xB1]);
        assert_eq!(program.signature().unwrap(), "void main(java.lang.String[])");
    }

    #[test]
    fn main_is_required() {
        let mut builder = ClassFileBuilder::new("Library");
        builder.method(0x0009, "helper", "()V", 0, 0, &[0xB1]);
        let error = Program::from_bytes(&builder.build(), &DecodeOptions::default()).unwrap_err();
        assert!(matches!(error, DecodeError::MissingMethod { name } if name == "main"));
    }

    #[test]
    fn main_needs_code() {
        let mut builder = ClassFileBuilder::new("Native");
        builder.declare_method(0x0109, "main", "([Ljava/lang/String;)V");
        let error = Program::from_bytes(&builder.build(), &DecodeOptions::default()).unwrap_err();
        assert!(matches!(error, DecodeError::MissingCode { .. }));
    }

    #[test]
    fn decode_errors_pass_through() {
        let error = Program::from_bytes(&[0xCA, 0xFE], &DecodeOptions::default()).unwrap_err();
        assert!(matches!(error, DecodeError::TruncatedInput { .. }));
    }
}
