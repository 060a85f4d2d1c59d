//! Compiling source text into executable function modules.
//!
//! A function module is an ECMAScript module with four required exports:
//!
//! | export        | requirement                        |
//! |---------------|------------------------------------|
//! | `name`        | a string                           |
//! | `description` | a string                           |
//! | `parameters`  | any value but `null`/`undefined`   |
//! | `default`     | a (possibly `async`) function      |
//!
//! Every compile call stages the text as a temporary file, loads it in a fresh
//! engine context, releases the staged file and then validates the exports.

use crate::error::{CompileError, InvokeError};
use boa_engine::{
    Context, JsObject, JsValue, Module, Source, builtins::promise::PromiseState, job::SimpleJobQueue,
    js_string,
};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    rc::Rc,
};
use toolsmith_core::{JsonValue, extension::TomlTableExt, state::Config};

mod staging;
mod value;

use staging::StagedSource;

/// Metadata a tool-calling consumer advertises for a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name.
    pub name: String,
    /// Function description.
    pub description: String,
    /// JSON-Schema-shaped parameters.
    pub parameters: JsonValue,
}

/// A compiled function module.
///
/// It owns the engine context the module was evaluated in, so the callable
/// stays bound to the module's top-level state. It is not `Send`.
pub struct FunctionModule {
    definition: FunctionDefinition,
    callable: JsObject,
    context: Context,
}

impl FunctionModule {
    /// Returns the exported name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Returns the exported description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.definition.description
    }

    /// Returns the exported parameters schema.
    #[inline]
    pub fn parameters(&self) -> &JsonValue {
        &self.definition.parameters
    }

    /// Returns a reference to the definition.
    #[inline]
    pub fn definition(&self) -> &FunctionDefinition {
        &self.definition
    }

    /// Consumes the module and returns its definition, dropping the callable.
    #[inline]
    pub fn into_definition(self) -> FunctionDefinition {
        self.definition
    }

    /// Calls the default export with one argument object.
    ///
    /// A returned promise is driven to completion; `undefined` maps to `null`.
    pub fn call(&mut self, arguments: &JsonValue) -> Result<JsonValue, InvokeError> {
        let arguments = value::from_json(arguments, &mut self.context)
            .map_err(InvokeError::InvalidArguments)?;
        let result = self
            .callable
            .call(&JsValue::undefined(), &[arguments], &mut self.context)
            .map_err(|err| {
                InvokeError::ExecutionFailed(value::describe_error(&err, &mut self.context))
            })?;
        let result = value::settle(result, &mut self.context)?;
        value::to_json(&result, &mut self.context).map_err(InvokeError::InvalidResult)
    }

    /// Calls the default export and renders the result as text.
    /// Strings are returned verbatim and other values as JSON.
    pub fn call_to_text(&mut self, arguments: &JsonValue) -> Result<String, InvokeError> {
        match self.call(arguments)? {
            JsonValue::String(text) => Ok(text),
            value => Ok(value.to_string()),
        }
    }
}

impl fmt::Debug for FunctionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionModule")
            .field("name", &self.definition.name)
            .field("description", &self.definition.description)
            .field("parameters", &self.definition.parameters)
            .finish_non_exhaustive()
    }
}

/// Compiler for function modules.
#[derive(Debug, Clone)]
pub struct ModuleCompiler {
    /// Directory where module sources are staged.
    scratch_dir: PathBuf,
    /// Maximum number of loop iterations in one evaluation.
    loop_iteration_limit: Option<u64>,
}

impl Default for ModuleCompiler {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl ModuleCompiler {
    /// Creates a new instance which stages sources in the directory.
    #[inline]
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            loop_iteration_limit: None,
        }
    }

    /// Creates a new instance from the `[compiler]` table of the config.
    pub fn from_config(config: &Config) -> Self {
        let mut compiler = Self::default();
        if let Some(config) = config.get_table("compiler") {
            if let Some(scratch_dir) = config.get_path("scratch-dir") {
                compiler.scratch_dir = scratch_dir.to_path_buf();
            }
            if let Some(limit) = config.get_usize("loop-iteration-limit") {
                compiler.loop_iteration_limit = Some(limit as u64);
            }
        }
        compiler
    }

    /// Limits the number of loop iterations, so that runaway top-level loops
    /// fail instead of hanging the caller.
    #[inline]
    pub fn with_loop_iteration_limit(mut self, limit: u64) -> Self {
        self.loop_iteration_limit = Some(limit);
        self
    }

    /// Returns the scratch directory.
    #[inline]
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Compiles the source text into a validated function module.
    ///
    /// The top-level code of the module runs exactly once. The staged file is
    /// released before this returns, whatever the outcome.
    pub fn compile(&self, code: &str) -> Result<FunctionModule, CompileError> {
        let staged = StagedSource::acquire(&self.scratch_dir, code)
            .map_err(|err| reject(format!("fail to stage the module source: {err}")))?;
        let loaded = panic::catch_unwind(AssertUnwindSafe(|| self.load(staged.path())))
            .unwrap_or_else(|_| Err("the script engine panicked".to_owned()));
        staged.release();

        let (namespace, mut context) = loaded.map_err(reject)?;
        let definition = validate_exports(&namespace, &mut context).map_err(reject)?;
        let callable = default_export(&namespace, &mut context).map_err(reject)?;
        Ok(FunctionModule {
            definition,
            callable,
            context,
        })
    }

    /// Parses, links and evaluates the staged module in a fresh context.
    fn load(&self, path: &Path) -> Result<(JsObject, Context), String> {
        let mut context = Context::builder()
            .job_queue(Rc::new(SimpleJobQueue::new()))
            .build()
            .map_err(|err| err.to_string())?;
        if let Some(limit) = self.loop_iteration_limit {
            context.runtime_limits_mut().set_loop_iteration_limit(limit);
        }

        let source = Source::from_filepath(path).map_err(|err| err.to_string())?;
        let module = Module::parse(source, None, &mut context)
            .map_err(|err| value::describe_error(&err, &mut context))?;
        let promise = module.load_link_evaluate(&mut context);
        context.run_jobs();
        match promise.state() {
            PromiseState::Fulfilled(_) => Ok((module.namespace(&mut context), context)),
            PromiseState::Rejected(reason) => {
                let err = boa_engine::JsError::from_opaque(reason);
                Err(value::describe_error(&err, &mut context))
            }
            PromiseState::Pending => Err("the module evaluation did not settle".to_owned()),
        }
    }
}

/// Logs the raw cause and wraps it in a compile error.
fn reject(reason: impl Into<String>) -> CompileError {
    let reason = reason.into();
    tracing::warn!(reason, "fail to compile the function module");
    CompileError::new(reason)
}

/// Checks the `name`, `description` and `parameters` exports in order.
fn validate_exports(namespace: &JsObject, context: &mut Context) -> Result<FunctionDefinition, String> {
    let name = namespace
        .get(js_string!("name"), context)
        .map_err(|err| value::describe_error(&err, context))?
        .as_string()
        .map(|s| s.to_std_string_escaped())
        .ok_or("missing `name` export")?;
    let description = namespace
        .get(js_string!("description"), context)
        .map_err(|err| value::describe_error(&err, context))?
        .as_string()
        .map(|s| s.to_std_string_escaped())
        .ok_or("missing `description` export")?;
    let parameters = namespace
        .get(js_string!("parameters"), context)
        .map_err(|err| value::describe_error(&err, context))?;
    if parameters.is_null_or_undefined() {
        return Err("missing `parameters` export".to_owned());
    }
    let parameters = value::to_json(&parameters, context)
        .map_err(|err| format!("invalid `parameters` export: {err}"))?;
    Ok(FunctionDefinition {
        name,
        description,
        parameters,
    })
}

/// Extracts the default export as a callable object.
fn default_export(namespace: &JsObject, context: &mut Context) -> Result<JsObject, String> {
    namespace
        .get(js_string!("default"), context)
        .map_err(|err| value::describe_error(&err, context))?
        .as_callable()
        .cloned()
        .ok_or_else(|| "missing default function export".to_owned())
}
