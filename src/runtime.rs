//! JVM runtime module responsible for creating a new runtime
//! environment and running programs.
use std::convert::Infallible;
use std::fmt;
use std::io::{self, Write};

use thiserror::Error;

use crate::attributes::CodeAttribute;
use crate::bytecode::{mnemonic, OPCode};
use crate::constant_pool::CPInfo;
use crate::descriptor::parse_method_descriptor;
use crate::jvm::ClassFile;

/// Class and field name of the one static field the runtime provides.
const SYSTEM_OUT: (&str, &str) = ("java/lang/System", "out");
/// Class and name of the one instance method the runtime provides.
const PRINTLN: (&str, &str) = ("java/io/PrintStream", "println");
/// Handle pushed by `getstatic java/lang/System.out`.
const PRINT_STREAM: &str = "java/io/PrintStream";

/// JVM value types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    /// Pool index pushed by `ldc`, resolved when consumed.
    ConstantPoolRef(u16),
    /// A built-in static object, named by its class.
    StaticClassHandle(String),
}

impl Value {
    fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "int {}", value),
            Self::ConstantPoolRef(index) => write!(f, "constant #{}", index),
            Self::StaticClassHandle(name) => write!(f, "static {}", name),
        }
    }
}

/// `RuntimeErrorKind` represents the possible errors that can occur
/// during runtime.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RuntimeErrorKind {
    TypeMismatch,
    UnsupportedOpcode,
    UnsupportedCallTarget,
    StackUnderflow,
    InvalidLocal,
    TruncatedInstruction,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::TypeMismatch => "type mismatch",
            Self::UnsupportedOpcode => "unsupported opcode",
            Self::UnsupportedCallTarget => "unsupported call target",
            Self::StackUnderflow => "stack underflow",
            Self::InvalidLocal => "invalid local",
            Self::TruncatedInstruction => "truncated instruction",
        };
        write!(f, "{}", name)
    }
}

/// `RuntimeError` is a diagnostic raised by a single instruction. It never
/// stops the run: the instruction is skipped and execution carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at pc {pc} ({}): {message}", opcode_name(.opcode))]
pub struct RuntimeError {
    pub pc: usize,
    pub opcode: u8,
    pub kind: RuntimeErrorKind,
    pub message: String,
}

pub type Diagnostic = RuntimeError;

fn opcode_name(opcode: &u8) -> &'static str {
    mnemonic(*opcode)
}

impl RuntimeError {
    pub fn new(pc: usize, opcode: u8, kind: RuntimeErrorKind, message: impl Into<String>) -> Self {
        Self {
            pc,
            opcode,
            kind,
            message: message.into(),
        }
    }
}

/// Execution state of one method invocation: a program counter into the
/// code array, the operand stack and the local variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pc: usize,
    stack: Vec<Value>,
    locals: Vec<Value>,
}

impl Frame {
    /// Fresh frame with `max_locals` locals, all `Int(0)`.
    pub fn new(max_locals: u16) -> Self {
        Self {
            pc: 0,
            stack: Vec::new(),
            locals: vec![Value::Int(0); max_locals as usize],
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn locals(&self) -> &[Value] {
        &self.locals
    }
}

/// What an instruction did to the run as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Continue,
    /// A line written to the output stream.
    Output(String),
    Halt,
}

/// Outcome of a single instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub effect: Effect,
    pub diagnostic: Option<Diagnostic>,
}

impl Step {
    fn next() -> Self {
        Self {
            effect: Effect::Continue,
            diagnostic: None,
        }
    }

    fn emit(line: String) -> Self {
        Self {
            effect: Effect::Output(line),
            diagnostic: None,
        }
    }

    fn halt() -> Self {
        Self {
            effect: Effect::Halt,
            diagnostic: None,
        }
    }

    fn fail(diagnostic: Diagnostic) -> Self {
        Self {
            effect: Effect::Continue,
            diagnostic: Some(diagnostic),
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    pub output: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    /// A `return` was reached, as opposed to running off the end of the code.
    pub halted: bool,
    /// Number of instructions dispatched.
    pub steps: usize,
}

/// `Runtime` represents an execution context for JVM programs and is
/// responsible for interpreting a method's instructions in bytecode format.
///
/// Calls and static fields are not linked against a class library. The only
/// targets understood are `System.out` and `PrintStream.println`; everything
/// else is reported as a diagnostic.
pub struct Runtime<'a> {
    class_file: &'a ClassFile,
}

impl<'a> Runtime<'a> {
    pub fn new(class_file: &'a ClassFile) -> Self {
        Self { class_file }
    }

    /// Run `code` to completion and collect what it produced.
    pub fn execute(&self, code: &CodeAttribute) -> Execution {
        match self.drive(code, |_| Ok::<(), Infallible>(())) {
            Ok(execution) => execution,
            Err(never) => match never {},
        }
    }

    /// Run `code`, writing output lines to `out` and diagnostics to `err` as
    /// they happen.
    pub fn run<O: Write, E: Write>(
        &self,
        code: &CodeAttribute,
        out: &mut O,
        err: &mut E,
    ) -> io::Result<Execution> {
        self.drive(code, |step| {
            if let Effect::Output(line) = &step.effect {
                writeln!(out, "{}", line)?;
            }
            if let Some(diagnostic) = &step.diagnostic {
                writeln!(err, "{}", diagnostic)?;
            }
            Ok(())
        })
    }

    fn drive<F, E>(&self, code: &CodeAttribute, mut observe: F) -> Result<Execution, E>
    where
        F: FnMut(&Step) -> Result<(), E>,
    {
        let mut frame = Frame::new(code.max_locals);
        let mut execution = Execution::default();
        // No branch instruction is executed, so pc only moves forward.
        while frame.pc < code.code.len() {
            let step = self.step(&mut frame, &code.code);
            execution.steps += 1;
            observe(&step)?;
            if let Some(diagnostic) = step.diagnostic {
                log::warn!("{}", diagnostic);
                execution.diagnostics.push(diagnostic);
            }
            match step.effect {
                Effect::Continue => {}
                Effect::Output(line) => execution.output.push(line),
                Effect::Halt => {
                    execution.halted = true;
                    break;
                }
            }
        }
        Ok(execution)
    }

    /// Execute the instruction at `frame.pc`. The program counter always moves
    /// past the instruction, whether or not it raised a diagnostic.
    pub fn step(&self, frame: &mut Frame, code: &[u8]) -> Step {
        let pc = frame.pc;
        let Some(&byte) = code.get(pc) else {
            return Step::halt();
        };
        let opcode = OPCode::from(byte);
        log::trace!(
            "{:>4}: {:<14} stack depth {}",
            pc,
            opcode.mnemonic(),
            frame.stack.len()
        );
        let end = pc + opcode.width();
        if end > code.len() {
            frame.pc = code.len();
            let fault = (
                RuntimeErrorKind::TruncatedInstruction,
                format!(
                    "needs {} operand bytes, {} left",
                    opcode.width() - 1,
                    code.len() - pc - 1
                ),
            );
            return diagnose(pc, byte, fault);
        }
        let operands = &code[pc + 1..end];
        frame.pc = end;

        let outcome = match opcode {
            OPCode::Iconst0 => push(frame, Value::Int(0)),
            OPCode::Iconst1 => push(frame, Value::Int(1)),
            OPCode::Iconst2 => push(frame, Value::Int(2)),
            OPCode::Iconst3 => push(frame, Value::Int(3)),
            OPCode::BiPush => push(frame, Value::Int(operands[0] as i8 as i32)),
            OPCode::Ldc => push(frame, Value::ConstantPoolRef(operands[0] as u16)),
            OPCode::ILoad1 => load(frame, 1),
            OPCode::ILoad2 => load(frame, 2),
            OPCode::ILoad3 => load(frame, 3),
            OPCode::IStore1 => store(frame, 1),
            OPCode::IStore2 => store(frame, 2),
            OPCode::IAdd => arithmetic(frame, i32::wrapping_add),
            OPCode::IMul => arithmetic(frame, i32::wrapping_mul),
            OPCode::IInc => increment(frame, operands[0] as usize, operands[1] as i8 as i32),
            OPCode::Return => Ok(Step::halt()),
            OPCode::GetStatic => self.get_static(frame, u16::from_be_bytes([operands[0], operands[1]])),
            OPCode::InvokeVirtual => {
                self.invoke_virtual(frame, u16::from_be_bytes([operands[0], operands[1]]))
            }
            OPCode::Unsupported(byte) => Err((
                RuntimeErrorKind::UnsupportedOpcode,
                format!("opcode 0x{:02x} ({}) not supported", byte, mnemonic(byte)),
            )),
        };
        outcome.unwrap_or_else(|fault| diagnose(pc, byte, fault))
    }

    fn get_static(&self, frame: &mut Frame, index: u16) -> Outcome {
        let field = self.member_ref(index, "Fieldref")?;
        if (field.class_name, field.name) != SYSTEM_OUT {
            return Err((
                RuntimeErrorKind::UnsupportedCallTarget,
                format!("unsupported static field {}.{}", field.class_name, field.name),
            ));
        }
        frame
            .stack
            .push(Value::StaticClassHandle(PRINT_STREAM.to_owned()));
        Ok(Step::next())
    }

    fn invoke_virtual(&self, frame: &mut Frame, index: u16) -> Outcome {
        let method = self.member_ref(index, "Methodref")?;
        if (method.class_name, method.name) != PRINTLN {
            return Err((
                RuntimeErrorKind::UnsupportedCallTarget,
                format!("unsupported method {}.{}", method.class_name, method.name),
            ));
        }
        let descriptor = self.descriptor(method.name_and_type_index)?;
        let arity = parse_method_descriptor(descriptor)
            .map_err(|error| (RuntimeErrorKind::UnsupportedCallTarget, error.to_string()))?
            .params
            .len();
        if arity > 1 {
            return Err((
                RuntimeErrorKind::UnsupportedCallTarget,
                format!("println{} takes {} arguments", descriptor, arity),
            ));
        }
        if frame.stack.len() < arity + 1 {
            return Err(underflow(arity + 1, frame.stack.len()));
        }
        let receiver_at = frame.stack.len() - arity - 1;
        match &frame.stack[receiver_at] {
            Value::StaticClassHandle(name) if name == PRINT_STREAM => {}
            other => {
                return Err((
                    RuntimeErrorKind::TypeMismatch,
                    format!("expected static {} receiver, found {}", PRINT_STREAM, other),
                ))
            }
        }
        let line = match frame.stack.last() {
            Some(argument) if arity == 1 => self.render(argument)?,
            _ => String::new(),
        };
        frame.stack.truncate(receiver_at);
        Ok(Step::emit(line))
    }

    /// Text `println` writes for a value.
    fn render(&self, value: &Value) -> Result<String, Fault> {
        let pool = self.class_file.constant_pool();
        match value {
            Value::Int(value) => Ok(value.to_string()),
            Value::ConstantPoolRef(index) => match pool.get(*index) {
                Some(CPInfo::ConstantString { .. }) => pool
                    .string(*index)
                    .map(str::to_owned)
                    .ok_or_else(|| unresolved_constant(*index, "String")),
                Some(CPInfo::ConstantInteger { value }) => Ok(value.to_string()),
                Some(CPInfo::ConstantFloat { value }) => Ok(format!("{:?}", value)),
                Some(entry) => Err((
                    RuntimeErrorKind::TypeMismatch,
                    format!("cannot print {} constant #{}", entry.kind(), index),
                )),
                None => Err(unresolved_constant(*index, "loadable")),
            },
            other => Err((
                RuntimeErrorKind::TypeMismatch,
                format!("cannot print {}", other),
            )),
        }
    }

    /// Class and member name of a Fieldref or Methodref. The descriptor is
    /// only resolved by callers that need it.
    fn member_ref(&self, index: u16, expected: &'static str) -> Result<Target<'a>, Fault> {
        let pool = self.class_file.constant_pool();
        let entry = pool.get(index).filter(|entry| entry.kind() == expected);
        let (class_index, name_and_type_index) = match entry {
            Some(
                CPInfo::ConstantFieldRef {
                    class_index,
                    name_and_type_index,
                }
                | CPInfo::ConstantMethodRef {
                    class_index,
                    name_and_type_index,
                },
            ) => (*class_index, *name_and_type_index),
            _ => return Err(unresolved_target(index, expected)),
        };
        let name_index = match pool.get(name_and_type_index) {
            Some(CPInfo::ConstantNameAndType { name_index, .. }) => *name_index,
            _ => return Err(unresolved_target(name_and_type_index, "NameAndType")),
        };
        Ok(Target {
            class_name: pool
                .class_name(class_index)
                .ok_or_else(|| unresolved_target(class_index, "Class"))?,
            name: pool
                .utf8(name_index)
                .ok_or_else(|| unresolved_target(name_index, "Utf8"))?,
            name_and_type_index,
        })
    }

    fn descriptor(&self, name_and_type_index: u16) -> Result<&'a str, Fault> {
        let pool = self.class_file.constant_pool();
        match pool.get(name_and_type_index) {
            Some(CPInfo::ConstantNameAndType {
                descriptor_index, ..
            }) => pool
                .utf8(*descriptor_index)
                .ok_or_else(|| unresolved_target(*descriptor_index, "Utf8")),
            _ => Err(unresolved_target(name_and_type_index, "NameAndType")),
        }
    }
}

/// A field or method reference resolved as far as its name.
struct Target<'a> {
    class_name: &'a str,
    name: &'a str,
    name_and_type_index: u16,
}

/// Result of an instruction body. A fault becomes a diagnostic.
type Outcome = Result<Step, Fault>;
type Fault = (RuntimeErrorKind, String);

fn diagnose(pc: usize, opcode: u8, (kind, message): Fault) -> Step {
    Step::fail(RuntimeError::new(pc, opcode, kind, message))
}

fn push(frame: &mut Frame, value: Value) -> Outcome {
    frame.stack.push(value);
    Ok(Step::next())
}

fn load(frame: &mut Frame, index: usize) -> Outcome {
    match local(frame, index)?.clone() {
        Value::Int(value) => push(frame, Value::Int(value)),
        other => Err(expected_int(&other)),
    }
}

fn store(frame: &mut Frame, index: usize) -> Outcome {
    local(frame, index)?;
    match frame.stack.pop() {
        None => Err(underflow(1, 0)),
        Some(Value::Int(value)) => {
            frame.locals[index] = Value::Int(value);
            Ok(Step::next())
        }
        Some(other) => {
            let fault = expected_int(&other);
            frame.stack.push(other);
            Err(fault)
        }
    }
}

/// Pops two operands and pushes `op(lhs, rhs)`. A non-int operand is read
/// as 0 and reported, so the stack keeps the declared shape.
fn arithmetic(frame: &mut Frame, op: fn(i32, i32) -> i32) -> Outcome {
    if frame.stack.len() < 2 {
        return Err(underflow(2, frame.stack.len()));
    }
    let operands = frame.stack.split_off(frame.stack.len() - 2);
    let (lhs, rhs) = (&operands[0], &operands[1]);
    frame
        .stack
        .push(Value::Int(op(lhs.as_int().unwrap_or(0), rhs.as_int().unwrap_or(0))));
    match operands.iter().find(|value| value.as_int().is_none()) {
        Some(other) => Err(expected_int(other)),
        None => Ok(Step::next()),
    }
}

fn increment(frame: &mut Frame, index: usize, delta: i32) -> Outcome {
    match local(frame, index)?.clone() {
        Value::Int(value) => {
            frame.locals[index] = Value::Int(value.wrapping_add(delta));
            Ok(Step::next())
        }
        other => Err(expected_int(&other)),
    }
}

fn local(frame: &Frame, index: usize) -> Result<&Value, Fault> {
    frame.locals.get(index).ok_or_else(|| {
        (
            RuntimeErrorKind::InvalidLocal,
            format!("local {} out of range, method has {}", index, frame.locals.len()),
        )
    })
}

fn expected_int(found: &Value) -> Fault {
    (
        RuntimeErrorKind::TypeMismatch,
        format!("expected int, found {}", found),
    )
}

fn underflow(needed: usize, found: usize) -> Fault {
    (
        RuntimeErrorKind::StackUnderflow,
        format!("needs {} stack values, found {}", needed, found),
    )
}

fn unresolved_target(index: u16, expected: &str) -> Fault {
    (
        RuntimeErrorKind::UnsupportedCallTarget,
        format!("constant #{} is not a {} entry", index, expected),
    )
}

fn unresolved_constant(index: u16, expected: &str) -> Fault {
    (
        RuntimeErrorKind::TypeMismatch,
        format!("constant #{} is not a {} entry", index, expected),
    )
}
