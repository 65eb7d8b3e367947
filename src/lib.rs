//! ristretto decodes JVM class files and interprets a small subset of the
//! bytecode they carry.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let program = ristretto::Program::load(Path::new("Main.class"))?;
//! program.run(&mut std::io::stdout(), &mut std::io::stderr())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod attributes;
pub mod bytecode;
pub mod config;
pub mod constant_pool;
pub mod descriptor;
pub mod display;
pub mod error;
pub mod jvm;
pub mod members;
pub mod program;
pub mod reader;
pub mod runtime;

#[doc(hidden)]
pub mod test_utils;

pub use config::{DecodeOptions, PoolSlotPolicy, TextPolicy};
pub use error::{DecodeError, Result};
pub use jvm::{ClassFile, JVMParser};
pub use program::Program;
pub use runtime::{Execution, Runtime, RuntimeError, RuntimeErrorKind, Value};
