//! Human readable dump of a decoded class file.
use std::fmt;

use crate::attributes::AttributeInfo;
use crate::constant_pool::{CPInfo, ConstantPool};
use crate::descriptor::format_descriptor;
use crate::jvm::ClassFile;
use crate::members::MemberInfo;

impl fmt::Display for ClassFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let pool = self.constant_pool();
        writeln!(f, "Version: {}", self.version())?;
        writeln!(
            f,
            "Access flags: (0x{:04X}) {}",
            self.access_flags().bits(),
            self.access_flags()
        )?;
        writeln!(
            f,
            "This class: (#{}) {}",
            self.this_class(),
            self.this_class_name().unwrap_or("?")
        )?;
        writeln!(
            f,
            "Super class: (#{}) {}",
            self.super_class(),
            self.super_class_name().unwrap_or("-")
        )?;

        writeln!(f, "Interfaces: ({})", self.interfaces().len())?;
        for (i, &index) in self.interfaces().iter().enumerate() {
            writeln!(f, "\t#{} {}", i + 1, pool.class_name(index).unwrap_or("?"))?;
        }
        writeln!(f, "Fields: ({})", self.fields().len())?;
        for (i, field) in self.fields().iter().enumerate() {
            writeln!(f, "\t#{} {}", i + 1, Member(pool, field))?;
        }
        writeln!(f, "Methods: ({})", self.methods().len())?;
        for (i, method) in self.methods().iter().enumerate() {
            writeln!(f, "\t#{} {}", i + 1, Member(pool, method))?;
        }

        writeln!(f, "Constant pool: ({})", pool.len())?;
        for (index, entry) in pool.iter() {
            writeln!(f, "\t#{} {}: {}", index, entry.kind(), Entry(pool, entry))?;
        }

        writeln!(f, "Attributes: ({})", self.attributes().len())?;
        for (i, attribute) in self.attributes().iter().enumerate() {
            write!(f, "\t#{} {}", i + 1, attribute.kind().name())?;
            match attribute {
                AttributeInfo::SourceFile { sourcefile, .. } => writeln!(f, ": {}", sourcefile)?,
                AttributeInfo::Opaque { length, .. } => writeln!(f, ": {} bytes", length)?,
                _ => writeln!(f)?,
            }
        }
        Ok(())
    }
}

/// `name` and descriptor rendered as a declaration, with the raw descriptor
/// as fallback.
fn declaration(descriptor: &str, name: &str) -> String {
    format_descriptor(descriptor, name).unwrap_or_else(|_| format!("{} {}", name, descriptor))
}

struct Member<'a>(&'a ConstantPool, &'a MemberInfo);

impl fmt::Display for Member<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Member(pool, member) = self;
        let flags = member.access_flags().to_string();
        if !flags.is_empty() {
            write!(f, "{} ", flags)?;
        }
        match member.descriptor(pool) {
            Ok(descriptor) => write!(f, "{}", declaration(descriptor, member.name())),
            Err(_) => write!(f, "{} #{}", member.name(), member.descriptor_index()),
        }
    }
}

struct Entry<'a>(&'a ConstantPool, &'a CPInfo);

impl fmt::Display for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Entry(pool, entry) = self;
        match entry {
            CPInfo::ConstantUtf8 { bytes } => write!(f, "{}", bytes),
            CPInfo::ConstantInteger { value } => write!(f, "{}", value),
            CPInfo::ConstantFloat { value } => write!(f, "{:?}", value),
            CPInfo::ConstantLong { value } => write!(f, "{}", value),
            CPInfo::ConstantDouble { value } => write!(f, "{:?}", value),
            CPInfo::ConstantClass { name_index } => {
                write!(f, "#{} {}", name_index, pool.utf8(*name_index).unwrap_or("?"))
            }
            CPInfo::ConstantString { string_index } => {
                write!(f, "#{} {}", string_index, pool.utf8(*string_index).unwrap_or("?"))
            }
            CPInfo::ConstantNameAndType {
                name_index,
                descriptor_index,
            } => {
                write!(f, "#{} #{}", name_index, descriptor_index)?;
                if let (Some(name), Some(descriptor)) =
                    (pool.utf8(*name_index), pool.utf8(*descriptor_index))
                {
                    write!(f, " {}", declaration(descriptor, name))?;
                }
                Ok(())
            }
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
            } => {
                write!(f, "#{} #{}", class_index, name_and_type_index)?;
                if let (Some(class_name), Some((name, descriptor))) = (
                    pool.class_name(*class_index),
                    pool.name_and_type(*name_and_type_index),
                ) {
                    write!(f, " {} {}", class_name, declaration(descriptor, name))?;
                }
                Ok(())
            }
            CPInfo::ConstantMethodHandle {
                reference_kind,
                reference_index,
            } => write!(f, "kind {} #{}", reference_kind, reference_index),
            CPInfo::ConstantMethodType { descriptor_index } => write!(
                f,
                "#{} {}",
                descriptor_index,
                pool.utf8(*descriptor_index).unwrap_or("?")
            ),
            CPInfo::ConstantInvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => write!(f, "#{} #{}", bootstrap_method_attr_index, name_and_type_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::jvm::JVMParser;
    use crate::test_utils::ClassFileBuilder;

    #[test]
    fn dumps_the_class_file() {
        let mut builder = ClassFileBuilder::new("demo/Main");
        builder.system_out();
        builder.println("I");
        builder.long(-3);
        builder.field(0x0002, "count", "I");
        builder.method(0x0009, "main", "([Ljava/lang/String;)V", 2, 1, &[0xB1]);
        builder.source_file("Main.java");
        let dump = JVMParser::parse(&builder.build()).unwrap().to_string();

        assert!(dump.starts_with("Version: 52.0\nAccess flags: (0x0021) public super\n"));
        assert!(dump.contains("This class: (#2) demo/Main\n"));
        assert!(dump.contains("Super class: (#4) java/lang/Object\n"));
        assert!(dump.contains("Fields: (1)\n\t#1 private int count\n"));
        assert!(dump.contains("Methods: (1)\n\t#1 public static void main(java.lang.String[])\n"));
        assert!(dump.contains("\t#1 Utf8: demo/Main\n"));
        assert!(dump.contains("\t#2 Class: #1 demo/Main\n"));
        assert!(dump.contains(" Fieldref: #6 #9 java/lang/System java.io.PrintStream out\n"));
        assert!(dump.contains(" Methodref: #12 #15 java/io/PrintStream void println(int)\n"));
        assert!(dump.contains(" Long: -3\n"));
        assert!(dump.ends_with("Attributes: (1)\n\t#1 SourceFile: Main.java\n"));
    }
}
