#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

pub mod error;
pub mod function;
pub mod id;
pub mod module;
pub mod store;
pub mod tool;

#[doc(no_inline)]
pub use error::{CompileError, Error, InvokeError, Result, StoreError};
#[doc(no_inline)]
pub use function::{Function, FunctionManager, FunctionTransfer, NewFunction};
#[doc(no_inline)]
pub use module::{FunctionDefinition, FunctionModule, ModuleCompiler};
#[doc(no_inline)]
pub use store::{FileStore, FunctionRecord, MemoryStore, RecordStore};
#[doc(no_inline)]
pub use tool::{FunctionExecutor, ScriptFunction};
