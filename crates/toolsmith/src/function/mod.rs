//! Function entities: identity, cached metadata and persistence shapes.

use crate::{
    error::{CompileError, Error},
    id::generate_id,
    module::{FunctionDefinition, FunctionModule, ModuleCompiler},
    store::FunctionRecord,
};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use toolsmith_core::{JsonValue, json};

mod manager;
mod transfer;

pub use manager::FunctionManager;
pub use transfer::FunctionTransfer;

/// Name cached when the code fails to compile.
pub const FALLBACK_NAME: &str = "function";

/// Description cached when the code fails to compile.
pub const FALLBACK_DESCRIPTION: &str = "unable to parse code";

/// Source text of a newly authored function.
pub const DEFAULT_FUNCTION_CODE: &str = r#"export const name = "roll_dice";

export const description = "Rolls a die with the given number of sides and returns the result";

export const parameters = {
  type: "object",
  properties: {
    sides: {
      type: "integer",
      description: "Number of sides of the die, at least 2",
    },
  },
  required: ["sides"],
};

export default async function ({ sides }) {
  return String(1 + Math.floor(Math.random() * sides));
}
"#;

/// Fields for constructing a function entity.
#[derive(Debug, Clone, Default)]
pub struct NewFunction {
    /// Id; a fresh one is generated if absent.
    pub id: Option<String>,
    /// Date; defaults to now.
    pub date: Option<DateTime<Utc>>,
    /// Function name.
    pub name: String,
    /// Function description.
    pub description: String,
    /// Parameters schema.
    pub parameters: JsonValue,
    /// Source text.
    pub code: String,
}

/// A persisted function module.
///
/// The cached `name`, `description` and `parameters` are a display cache: they
/// reflect the last save, not necessarily what `code` compiles to right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "FunctionTransfer", try_from = "FunctionTransfer")]
pub struct Function {
    id: String,
    date: DateTime<Utc>,
    name: String,
    description: String,
    parameters: JsonValue,
    code: String,
}

impl Function {
    /// Creates a new entity without looking at the code.
    pub fn new(fields: NewFunction) -> Self {
        Self {
            id: fields.id.unwrap_or_else(generate_id),
            date: fields.date.map(|date| date.trunc_subsecs(3)).unwrap_or_else(now),
            name: fields.name,
            description: fields.description,
            parameters: fields.parameters,
            code: fields.code,
        }
    }

    /// Creates a new entity from the default template.
    pub fn template() -> Self {
        Self::new(NewFunction {
            name: "roll_dice".to_owned(),
            description: "Rolls a die with the given number of sides and returns the result"
                .to_owned(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "sides": {
                        "type": "integer",
                        "description": "Number of sides of the die, at least 2",
                    },
                },
                "required": ["sides"],
            }),
            code: DEFAULT_FUNCTION_CODE.to_owned(),
            ..NewFunction::default()
        })
    }

    /// Creates a new entity from a compiled definition and its source text.
    pub(crate) fn from_definition(definition: FunctionDefinition, code: String) -> Self {
        Self::new(NewFunction {
            name: definition.name,
            description: definition.description,
            parameters: definition.parameters,
            code,
            ..NewFunction::default()
        })
    }

    /// Reconstructs an entity from its stored record.
    pub fn from_record(record: FunctionRecord) -> Self {
        Self {
            id: record.id,
            date: record.date,
            name: record.name,
            description: record.description,
            parameters: record.parameters,
            code: record.code,
        }
    }

    /// Returns the stored record of the entity.
    pub fn to_record(&self) -> FunctionRecord {
        FunctionRecord {
            id: self.id.clone(),
            date: self.date,
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
            code: self.code.clone(),
        }
    }

    /// Returns the transfer representation of the entity.
    pub fn to_transfer(&self) -> FunctionTransfer {
        FunctionTransfer::from(self.clone())
    }

    /// Serializes the transfer representation as pretty JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(&self.to_transfer())?)
    }

    /// Deserializes an entity from its transfer representation in JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let transfer = serde_json::from_str::<FunctionTransfer>(json)?;
        Self::try_from(transfer)
    }

    /// Returns the id.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the creation or last save date.
    #[inline]
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Returns the cached name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the cached description.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the cached parameters schema.
    #[inline]
    pub fn parameters(&self) -> &JsonValue {
        &self.parameters
    }

    /// Returns the source text.
    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Replaces the source text. The cached metadata is refreshed on the next save.
    #[inline]
    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    /// Returns `true` if the cached metadata is the fallback of a failed compile.
    pub fn is_broken(&self) -> bool {
        self.name == FALLBACK_NAME && self.description == FALLBACK_DESCRIPTION
    }

    /// Returns the cached metadata as a definition.
    pub fn definition(&self) -> FunctionDefinition {
        FunctionDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    /// Compiles the current source text.
    #[inline]
    pub fn compile(&self, compiler: &ModuleCompiler) -> Result<FunctionModule, CompileError> {
        compiler.compile(&self.code)
    }

    /// Stamps the date and refreshes the cached metadata from a compile outcome.
    ///
    /// A failed compile leaves the fallback name and description and keeps the
    /// previous parameters.
    pub(crate) fn refresh(&mut self, compiled: Result<FunctionDefinition, CompileError>) {
        self.date = now();
        match compiled {
            Ok(definition) => {
                self.name = non_empty_or(definition.name, FALLBACK_NAME);
                self.description = non_empty_or(definition.description, FALLBACK_DESCRIPTION);
                self.parameters = definition.parameters;
            }
            Err(err) => {
                tracing::info!(id = %self.id, "cache the fallback metadata: {err}");
                self.name = FALLBACK_NAME.to_owned();
                self.description = FALLBACK_DESCRIPTION.to_owned();
            }
        }
    }
}

impl Default for Function {
    #[inline]
    fn default() -> Self {
        Self::template()
    }
}

/// Current time truncated to the millisecond precision of stored timestamps.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_owned()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DEFAULT_FUNCTION_CODE, FALLBACK_DESCRIPTION, FALLBACK_NAME, Function, NewFunction,
    };
    use crate::{
        error::CompileError,
        module::{FunctionDefinition, ModuleCompiler},
    };
    use chrono::{TimeZone, Utc};
    use toolsmith_core::json;

    fn weather() -> Function {
        Function::new(NewFunction {
            id: Some("weather-1".to_owned()),
            date: Some(Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()),
            name: "get_weather".to_owned(),
            description: "Returns the weather".to_owned(),
            parameters: json!({ "type": "object", "properties": { "city": { "type": "string" } } }),
            code: "export default 42;".to_owned(),
        })
    }

    #[test]
    fn it_fills_missing_identity() {
        let first = Function::new(NewFunction::default());
        let second = Function::new(NewFunction::default());
        assert_ne!(first.id(), second.id());
        assert_eq!(first.id().len(), 22);
        assert_eq!(first.date().timestamp_subsec_nanos() % 1_000_000, 0);

        let function = weather();
        assert_eq!(function.id(), "weather-1");
        assert_eq!(function.date().timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn it_round_trips_the_record() {
        let function = weather();
        let restored = Function::from_record(function.to_record());
        assert_eq!(restored, function);

        let json = serde_json::to_string(&function.to_record()).unwrap();
        let restored = Function::from_record(serde_json::from_str(&json).unwrap());
        assert_eq!(restored, function);
    }

    #[test]
    fn it_refreshes_metadata_from_a_definition() {
        let mut function = weather();
        let date = function.date();
        function.refresh(Ok(FunctionDefinition {
            name: "forecast".to_owned(),
            description: String::new(),
            parameters: json!({ "type": "object" }),
        }));
        assert_eq!(function.name(), "forecast");
        assert_eq!(function.description(), FALLBACK_DESCRIPTION);
        assert_eq!(function.parameters(), &json!({ "type": "object" }));
        assert!(function.date() >= date);
    }

    #[test]
    fn it_falls_back_on_compile_errors() {
        let mut function = weather();
        let parameters = function.parameters().clone();
        function.refresh(Err(CompileError::new("missing `name` export")));
        assert_eq!(function.name(), FALLBACK_NAME);
        assert_eq!(function.description(), FALLBACK_DESCRIPTION);
        assert_eq!(function.parameters(), &parameters);
        assert!(function.is_broken());
    }

    #[test]
    fn it_matches_the_template_metadata() {
        let scratch_dir = tempfile::tempdir().unwrap();
        let compiler = ModuleCompiler::new(scratch_dir.path());
        let template = Function::template();
        assert_eq!(template.code(), DEFAULT_FUNCTION_CODE);

        let mut module = template.compile(&compiler).unwrap();
        assert_eq!(module.definition(), &template.definition());

        let roll = module.call_to_text(&json!({ "sides": 6 })).unwrap();
        let roll = roll.parse::<u32>().unwrap();
        assert!((1..=6).contains(&roll));
    }

    #[test]
    fn it_uses_the_transfer_shape_for_serde() {
        let function = weather();
        let value = serde_json::to_value(&function).unwrap();
        assert_eq!(value["date"], json!("2023-11-14T22:13:20.123Z"));
        assert_eq!(value["id"], json!("weather-1"));

        let restored: Function = serde_json::from_value(value).unwrap();
        assert_eq!(restored, function);
    }
}
