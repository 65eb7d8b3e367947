//! JVM bytecode opcodes understood by the runtime.

/// Opcodes the runtime executes. Anything else decodes to `Unsupported`
/// carrying the raw byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OPCode {
    Iconst0,
    Iconst1,
    Iconst2,
    Iconst3,
    BiPush,
    Ldc,
    ILoad1,
    ILoad2,
    ILoad3,
    IStore1,
    IStore2,
    IAdd,
    IMul,
    IInc,
    Return,
    GetStatic,
    InvokeVirtual,
    Unsupported(u8),
}

impl From<u8> for OPCode {
    fn from(byte: u8) -> Self {
        match byte {
            0x03 => Self::Iconst0,
            0x04 => Self::Iconst1,
            0x05 => Self::Iconst2,
            0x06 => Self::Iconst3,
            0x10 => Self::BiPush,
            0x12 => Self::Ldc,
            0x1B => Self::ILoad1,
            0x1C => Self::ILoad2,
            0x1D => Self::ILoad3,
            0x3C => Self::IStore1,
            0x3D => Self::IStore2,
            0x60 => Self::IAdd,
            0x68 => Self::IMul,
            0x84 => Self::IInc,
            0xB1 => Self::Return,
            0xB2 => Self::GetStatic,
            0xB6 => Self::InvokeVirtual,
            _ => Self::Unsupported(byte),
        }
    }
}

impl From<OPCode> for u8 {
    fn from(opcode: OPCode) -> Self {
        match opcode {
            OPCode::Iconst0 => 0x03,
            OPCode::Iconst1 => 0x04,
            OPCode::Iconst2 => 0x05,
            OPCode::Iconst3 => 0x06,
            OPCode::BiPush => 0x10,
            OPCode::Ldc => 0x12,
            OPCode::ILoad1 => 0x1B,
            OPCode::ILoad2 => 0x1C,
            OPCode::ILoad3 => 0x1D,
            OPCode::IStore1 => 0x3C,
            OPCode::IStore2 => 0x3D,
            OPCode::IAdd => 0x60,
            OPCode::IMul => 0x68,
            OPCode::IInc => 0x84,
            OPCode::Return => 0xB1,
            OPCode::GetStatic => 0xB2,
            OPCode::InvokeVirtual => 0xB6,
            OPCode::Unsupported(byte) => byte,
        }
    }
}

impl OPCode {
    /// Encoded width in bytes, opcode included. Unsupported opcodes count as
    /// one byte so the runtime can step over them.
    pub fn width(&self) -> usize {
        match self {
            Self::BiPush | Self::Ldc => 2,
            Self::IInc | Self::GetStatic | Self::InvokeVirtual => 3,
            _ => 1,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        mnemonic(u8::from(*self))
    }
}

/// Returns the assembler mnemonic of any opcode byte.
pub fn mnemonic(byte: u8) -> &'static str {
    match byte {
        0xCA => "breakpoint",
        0xFE => "impdep1",
        0xFF => "impdep2",
        _ => MNEMONICS.get(byte as usize).copied().unwrap_or("<reserved>"),
    }
}

// Indexed by opcode, 0x00 through 0xc9.
const MNEMONICS: [&str; 202] = [
    "nop", "aconst_null", "iconst_m1", "iconst_0", "iconst_1", "iconst_2", "iconst_3", "iconst_4",
    "iconst_5", "lconst_0", "lconst_1", "fconst_0", "fconst_1", "fconst_2", "dconst_0", "dconst_1",
    "bipush", "sipush", "ldc", "ldc_w", "ldc2_w", "iload", "lload", "fload",
    "dload", "aload", "iload_0", "iload_1", "iload_2", "iload_3", "lload_0", "lload_1",
    "lload_2", "lload_3", "fload_0", "fload_1", "fload_2", "fload_3", "dload_0", "dload_1",
    "dload_2", "dload_3", "aload_0", "aload_1", "aload_2", "aload_3", "iaload", "laload",
    "faload", "daload", "aaload", "baload", "caload", "saload", "istore", "lstore",
    "fstore", "dstore", "astore", "istore_0", "istore_1", "istore_2", "istore_3", "lstore_0",
    "lstore_1", "lstore_2", "lstore_3", "fstore_0", "fstore_1", "fstore_2", "fstore_3", "dstore_0",
    "dstore_1", "dstore_2", "dstore_3", "astore_0", "astore_1", "astore_2", "astore_3", "iastore",
    "lastore", "fastore", "dastore", "aastore", "bastore", "castore", "sastore", "pop",
    "pop2", "dup", "dup_x1", "dup_x2", "dup2", "dup2_x1", "dup2_x2", "swap",
    "iadd", "ladd", "fadd", "dadd", "isub", "lsub", "fsub", "dsub",
    "imul", "lmul", "fmul", "dmul", "idiv", "ldiv", "fdiv", "ddiv",
    "irem", "lrem", "frem", "drem", "ineg", "lneg", "fneg", "dneg",
    "ishl", "lshl", "ishr", "lshr", "iushr", "lushr", "iand", "land",
    "ior", "lor", "ixor", "lxor", "iinc", "i2l", "i2f", "i2d",
    "l2i", "l2f", "l2d", "f2i", "f2l", "f2d", "d2i", "d2l",
    "d2f", "i2b", "i2c", "i2s", "lcmp", "fcmpl", "fcmpg", "dcmpl",
    "dcmpg", "ifeq", "ifne", "iflt", "ifge", "ifgt", "ifle", "if_icmpeq",
    "if_icmpne", "if_icmplt", "if_icmpge", "if_icmpgt", "if_icmple", "if_acmpeq", "if_acmpne", "goto",
    "jsr", "ret", "tableswitch", "lookupswitch", "ireturn", "lreturn", "freturn", "dreturn",
    "areturn", "return", "getstatic", "putstatic", "getfield", "putfield", "invokevirtual", "invokespecial",
    "invokestatic", "invokeinterface", "invokedynamic", "new", "newarray", "anewarray", "arraylength", "athrow",
    "checkcast", "instanceof", "monitorenter", "monitorexit", "wide", "multianewarray", "ifnull", "ifnonnull",
    "goto_w", "jsr_w",
];
