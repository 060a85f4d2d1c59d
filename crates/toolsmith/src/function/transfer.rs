use super::Function;
use crate::error::Error;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use toolsmith_core::JsonValue;

/// Plain representation of a function for export, import and API responses.
///
/// The date is an ISO 8601 string with millisecond precision in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTransfer {
    /// Function id.
    pub id: String,
    /// Creation or last save date.
    pub date: String,
    /// Cached function name.
    pub name: String,
    /// Cached function description.
    pub description: String,
    /// Cached parameters schema.
    pub parameters: JsonValue,
    /// Source text.
    pub code: String,
}

impl From<Function> for FunctionTransfer {
    fn from(function: Function) -> Self {
        Self {
            id: function.id,
            date: function.date.to_rfc3339_opts(SecondsFormat::Millis, true),
            name: function.name,
            description: function.description,
            parameters: function.parameters,
            code: function.code,
        }
    }
}

impl TryFrom<FunctionTransfer> for Function {
    type Error = Error;

    fn try_from(transfer: FunctionTransfer) -> Result<Self, Self::Error> {
        let date = DateTime::parse_from_rfc3339(&transfer.date)
            .map_err(|source| Error::InvalidDate {
                date: transfer.date.clone(),
                source,
            })?
            .with_timezone(&Utc)
            .trunc_subsecs(3);
        Ok(Self {
            id: transfer.id,
            date,
            name: transfer.name,
            description: transfer.description,
            parameters: transfer.parameters,
            code: transfer.code,
        })
    }
}
