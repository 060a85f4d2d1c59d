use super::Function;
use crate::{
    error::{CompileError, Error, StoreError},
    module::{FunctionDefinition, FunctionModule, ModuleCompiler},
    store::{self, RecordStore},
    tool::ScriptFunction,
};
use std::sync::Arc;
use toolsmith_core::{JsonValue, state::Config};

/// Lifecycle manager of function entities.
///
/// Compilation runs on a blocking worker thread, so a slow module never
/// stalls the async executor and the futures returned here are `Send`.
#[derive(Clone)]
pub struct FunctionManager {
    /// Compiler for the module source text.
    compiler: ModuleCompiler,
    /// Shared record store.
    store: Arc<dyn RecordStore>,
}

impl FunctionManager {
    /// Creates a new instance.
    #[inline]
    pub fn new(compiler: ModuleCompiler, store: Arc<dyn RecordStore>) -> Self {
        Self { compiler, store }
    }

    /// Creates a new instance from the `[compiler]` and `[store]` tables.
    pub async fn from_config(config: &Config) -> Result<Self, StoreError> {
        let compiler = ModuleCompiler::from_config(config);
        let store = store::open(config).await?;
        Ok(Self::new(compiler, store))
    }

    /// Returns a reference to the compiler.
    #[inline]
    pub fn compiler(&self) -> &ModuleCompiler {
        &self.compiler
    }

    /// Returns a reference to the record store.
    #[inline]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Compiles the source text and derives a new, unsaved entity from it.
    pub async fn parse(&self, code: &str) -> Result<Function, CompileError> {
        let definition = self.compile_definition(code.to_owned()).await?;
        Ok(Function::from_definition(definition, code.to_owned()))
    }

    /// Finds the entity stored under the id.
    pub async fn find(&self, id: &str) -> Result<Option<Function>, StoreError> {
        let record = self.store.get(id).await?;
        Ok(record.map(Function::from_record))
    }

    /// Recompiles the code, refreshes the cached metadata and upserts the entity.
    ///
    /// Broken code is not an error here: the entity is stored with the
    /// fallback name and description instead.
    pub async fn save(&self, function: &mut Function) -> Result<(), StoreError> {
        let compiled = self.compile_definition(function.code().to_owned()).await;
        function.refresh(compiled);
        self.store.put(function.to_record()).await?;
        tracing::info!(
            id = function.id(),
            name = function.name(),
            broken = function.is_broken(),
            "function saved"
        );
        Ok(())
    }

    /// Deletes the entity stored under the id. Deleting a missing id succeeds.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if self.find(id).await?.is_none() {
            tracing::debug!(id, "nothing to delete");
            return Ok(());
        }
        self.store.delete(id).await?;
        tracing::info!(id, "function deleted");
        Ok(())
    }

    /// Returns all stored entities, most recently saved first.
    pub async fn list(&self) -> Result<Vec<Function>, StoreError> {
        let mut functions = self
            .store
            .list()
            .await?
            .into_iter()
            .map(Function::from_record)
            .collect::<Vec<_>>();
        functions.sort_by(|a, b| b.date().cmp(&a.date()));
        Ok(functions)
    }

    /// Wraps the entity stored under the id as a tool executor.
    pub async fn executor(&self, id: &str) -> Result<ScriptFunction, Error> {
        let function = self
            .find(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_owned()))?;
        Ok(ScriptFunction::new(function, self.compiler.clone()))
    }

    /// Compiles the entity stored under the id and calls it with the arguments,
    /// rendering the result as text.
    pub async fn invoke(&self, id: &str, arguments: &JsonValue) -> Result<String, Error> {
        self.executor(id).await?.call_to_text(arguments.clone()).await
    }

    /// Compiles the source text on a blocking worker and keeps the definition.
    async fn compile_definition(&self, code: String) -> Result<FunctionDefinition, CompileError> {
        let compiler = self.compiler.clone();
        tokio::task::spawn_blocking(move || {
            compiler
                .compile(&code)
                .map(FunctionModule::into_definition)
        })
        .await
        .unwrap_or_else(|err| Err(CompileError::new(format!("compile task failed: {err}"))))
    }
}

#[cfg(test)]
mod tests {
    use super::FunctionManager;
    use crate::{
        error::{Error, InvokeError},
        function::{FALLBACK_DESCRIPTION, FALLBACK_NAME, Function, NewFunction},
        module::ModuleCompiler,
        store::{MemoryStore, RecordStore},
    };
    use chrono::{TimeZone, Utc};
    use std::{sync::Arc, time::Duration};
    use toolsmith_core::json;

    const GREET_MODULE: &str = r#"
        export const name = "greet";
        export const description = "Greets someone";
        export const parameters = {
            type: "object",
            properties: { who: { type: "string" } },
        };
        export default async ({ who }) => `Hello, ${who}!`;
    "#;

    fn manager() -> (tempfile::TempDir, Arc<MemoryStore>, FunctionManager) {
        let scratch_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let manager = FunctionManager::new(ModuleCompiler::new(scratch_dir.path()), store.clone());
        (scratch_dir, store, manager)
    }

    #[tokio::test]
    async fn it_parses_code_into_a_new_entity() {
        let (_scratch_dir, store, manager) = manager();
        let function = manager.parse(GREET_MODULE).await.unwrap();
        assert_eq!(function.name(), "greet");
        assert_eq!(function.description(), "Greets someone");
        assert_eq!(function.parameters()["properties"]["who"], json!({ "type": "string" }));
        assert_eq!(function.code(), GREET_MODULE);
        assert!(store.is_empty());

        let err = manager
            .parse("export const name = 'n'; export default () => 1;")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing `description` export"));
    }

    #[tokio::test]
    async fn it_saves_broken_code_with_fallback_metadata() {
        let (_scratch_dir, store, manager) = manager();
        let mut function = Function::new(NewFunction {
            name: "kept".to_owned(),
            description: "Kept until saved".to_owned(),
            parameters: json!({ "type": "object" }),
            code: "export default 42;".to_owned(),
            ..NewFunction::default()
        });
        manager.save(&mut function).await.unwrap();

        assert_eq!(function.name(), FALLBACK_NAME);
        assert_eq!(function.description(), FALLBACK_DESCRIPTION);
        assert_eq!(function.parameters(), &json!({ "type": "object" }));

        let record = store.get(function.id()).await.unwrap().unwrap();
        assert_eq!(record.date, function.date());
        assert_eq!(record.name, FALLBACK_NAME);
        assert_eq!(record.code, "export default 42;");
    }

    #[tokio::test]
    async fn it_refreshes_stale_metadata_on_save() {
        let (_scratch_dir, _store, manager) = manager();
        let mut function = Function::new(NewFunction {
            date: Some(Utc.timestamp_millis_opt(1_600_000_000_000).unwrap()),
            name: "stale".to_owned(),
            description: "Stale description".to_owned(),
            parameters: json!({}),
            code: GREET_MODULE.to_owned(),
            ..NewFunction::default()
        });
        manager.save(&mut function).await.unwrap();
        assert_eq!(function.name(), "greet");
        assert_eq!(function.description(), "Greets someone");
        assert_eq!(function.parameters()["type"], json!("object"));
        assert!(function.date().timestamp_millis() > 1_600_000_000_000);

        let found = manager.find(function.id()).await.unwrap().unwrap();
        assert_eq!(found, function);
    }

    #[tokio::test]
    async fn it_deletes_idempotently() {
        let (_scratch_dir, store, manager) = manager();
        let mut function = manager.parse(GREET_MODULE).await.unwrap();
        manager.save(&mut function).await.unwrap();
        assert_eq!(store.len(), 1);

        manager.delete(function.id()).await.unwrap();
        manager.delete(function.id()).await.unwrap();
        manager.delete("never-saved").await.unwrap();
        assert!(store.is_empty());
        assert!(manager.find(function.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn it_lists_the_most_recent_first() {
        let (_scratch_dir, store, manager) = manager();
        for (id, millis) in [("a", 1_000), ("b", 3_000), ("c", 2_000)] {
            let function = Function::new(NewFunction {
                id: Some(id.to_owned()),
                date: Some(Utc.timestamp_millis_opt(millis).unwrap()),
                code: "broken(".to_owned(),
                ..NewFunction::default()
            });
            store.put(function.to_record()).await.unwrap();
        }
        let ids = manager
            .list()
            .await
            .unwrap()
            .iter()
            .map(|function| function.id().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn it_invokes_stored_functions() {
        let (_scratch_dir, _store, manager) = manager();
        let mut function = manager.parse(GREET_MODULE).await.unwrap();
        manager.save(&mut function).await.unwrap();

        let text = manager
            .invoke(function.id(), &json!({ "who": "Ada" }))
            .await
            .unwrap();
        assert_eq!(text, "Hello, Ada!");

        match manager.invoke("missing", &json!({})).await {
            Err(Error::NotFound(id)) => assert_eq!(id, "missing"),
            result => panic!("unexpected result: {result:?}"),
        }

        function.set_code("export default 42;");
        manager.save(&mut function).await.unwrap();
        match manager.invoke(function.id(), &json!({})).await {
            Err(Error::Compile(err)) => {
                assert_eq!(err.reason(), "missing `name` export");
            }
            result => panic!("unexpected result: {result:?}"),
        }

        function.set_code(
            "export const name = 'boom'; export const description = 'd'; \
             export const parameters = {}; export default () => { throw new Error('bang'); };",
        );
        manager.save(&mut function).await.unwrap();
        match manager.invoke(function.id(), &json!({})).await {
            Err(Error::Invoke(InvokeError::ExecutionFailed(message))) => {
                assert!(message.contains("bang"), "{message}");
            }
            result => panic!("unexpected result: {result:?}"),
        }
    }

    #[tokio::test]
    async fn it_keeps_the_executor_responsive_while_compiling() {
        let scratch_dir = tempfile::tempdir().unwrap();
        let compiler = ModuleCompiler::new(scratch_dir.path()).with_loop_iteration_limit(1_000_000);
        let manager = FunctionManager::new(compiler, Arc::new(MemoryStore::new()));
        let mut function = Function::new(NewFunction {
            code: "while (true) { JSON.stringify({ spin: [1, 2, 3] }); }".to_owned(),
            ..NewFunction::default()
        });

        let saved = tokio::time::timeout(Duration::from_millis(20), manager.save(&mut function)).await;
        assert!(saved.is_err());
    }
}
