//! Exposing stored functions to a tool-calling consumer.
//!
//! A consumer registers executors by name and calls them with the JSON
//! arguments of a tool call. [`ScriptFunction`] is the executor backed by the
//! source text of a [`Function`].

use crate::{
    error::{Error, InvokeError},
    function::Function,
    module::{FunctionDefinition, FunctionModule, ModuleCompiler},
};
use toolsmith_core::JsonValue;

/// Interface of a callable tool.
#[async_trait::async_trait]
pub trait FunctionExecutor: Send + Sync {
    /// Executes the function with the given arguments.
    async fn execute(&self, arguments: JsonValue) -> Result<JsonValue, Error>;

    /// Returns the function name.
    fn get_name(&self) -> &str;

    /// Returns the function description.
    fn get_description(&self) -> &str;

    /// Returns the parameters schema.
    fn get_parameters_schema(&self) -> JsonValue;
}

/// A tool executor which compiles the code of a function on every call.
///
/// The advertised metadata is the cached one of the entity. Each call gets a
/// freshly evaluated module on a blocking worker thread, so no script state
/// leaks between calls.
#[derive(Debug, Clone)]
pub struct ScriptFunction {
    function: Function,
    compiler: ModuleCompiler,
}

impl ScriptFunction {
    /// Creates a new instance.
    #[inline]
    pub fn new(function: Function, compiler: ModuleCompiler) -> Self {
        Self { function, compiler }
    }

    /// Returns a reference to the wrapped entity.
    #[inline]
    pub fn function(&self) -> &Function {
        &self.function
    }

    /// Returns the advertised definition.
    #[inline]
    pub fn definition(&self) -> FunctionDefinition {
        self.function.definition()
    }

    /// Calls the function and renders the result as text.
    pub async fn call_to_text(&self, arguments: JsonValue) -> Result<String, Error> {
        self.run(move |module| module.call_to_text(&arguments)).await
    }

    /// Compiles the code and runs the closure against the module.
    async fn run<T, F>(&self, f: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&mut FunctionModule) -> Result<T, InvokeError> + Send + 'static,
    {
        let compiler = self.compiler.clone();
        let code = self.function.code().to_owned();
        tracing::debug!(id = self.function.id(), "invoke the function");
        tokio::task::spawn_blocking(move || -> Result<T, Error> {
            let mut module = compiler.compile(&code)?;
            f(&mut module).map_err(Error::from)
        })
        .await
        .map_err(|err| InvokeError::ExecutionFailed(format!("worker task failed: {err}")))?
    }
}

#[async_trait::async_trait]
impl FunctionExecutor for ScriptFunction {
    async fn execute(&self, arguments: JsonValue) -> Result<JsonValue, Error> {
        self.run(move |module| module.call(&arguments)).await
    }

    #[inline]
    fn get_name(&self) -> &str {
        self.function.name()
    }

    #[inline]
    fn get_description(&self) -> &str {
        self.function.description()
    }

    #[inline]
    fn get_parameters_schema(&self) -> JsonValue {
        self.function.parameters().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{FunctionExecutor, ScriptFunction};
    use crate::{error::Error, function::Function, module::ModuleCompiler};
    use std::{collections::HashMap, sync::Arc};
    use toolsmith_core::json;

    #[tokio::test]
    async fn it_executes_as_a_registered_tool() {
        let scratch_dir = tempfile::tempdir().unwrap();
        let compiler = ModuleCompiler::new(scratch_dir.path());
        let template = ScriptFunction::new(Function::template(), compiler);

        let mut registry: HashMap<String, Arc<dyn FunctionExecutor>> = HashMap::new();
        registry.insert(template.get_name().to_owned(), Arc::new(template));

        let executor = registry.get("roll_dice").unwrap();
        assert_eq!(
            executor.get_description(),
            "Rolls a die with the given number of sides and returns the result"
        );
        assert_eq!(executor.get_parameters_schema()["required"], json!(["sides"]));

        let roll = executor.execute(json!({ "sides": 2 })).await.unwrap();
        let roll = roll.as_str().unwrap().parse::<u32>().unwrap();
        assert!(roll == 1 || roll == 2);
    }

    #[tokio::test]
    async fn it_surfaces_compile_errors() {
        let scratch_dir = tempfile::tempdir().unwrap();
        let mut function = Function::template();
        function.set_code("export default 42;");
        let executor = ScriptFunction::new(function, ModuleCompiler::new(scratch_dir.path()));

        // Cached metadata is advertised even though the code no longer compiles.
        assert_eq!(executor.get_name(), "roll_dice");
        assert!(matches!(
            executor.execute(json!({})).await,
            Err(Error::Compile(_))
        ));
    }
}
