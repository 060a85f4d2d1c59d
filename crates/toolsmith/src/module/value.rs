//! Conversions between script values and JSON.

use crate::error::InvokeError;
use boa_engine::{
    Context, JsError, JsValue, builtins::promise::{Promise, PromiseState}, object::builtins::JsPromise,
};
use toolsmith_core::JsonValue;

/// Renders a script error as `Kind: message` where possible.
pub(crate) fn describe_error(err: &JsError, context: &mut Context) -> String {
    match err.try_native(context) {
        Ok(native) => native.to_string(),
        Err(_) => err.to_string(),
    }
}

/// Converts a script value to JSON, mapping `undefined` to `null`.
pub(crate) fn to_json(value: &JsValue, context: &mut Context) -> Result<JsonValue, String> {
    if value.is_undefined() {
        return Ok(JsonValue::Null);
    }
    value
        .to_json(context)
        .map_err(|err| describe_error(&err, context))
}

/// Converts JSON to a script value.
pub(crate) fn from_json(value: &JsonValue, context: &mut Context) -> Result<JsValue, String> {
    JsValue::from_json(value, context).map_err(|err| describe_error(&err, context))
}

/// Drains the job queue and unwraps the value if it is a promise.
pub(crate) fn settle(value: JsValue, context: &mut Context) -> Result<JsValue, InvokeError> {
    context.run_jobs();
    let promise = match value.as_object() {
        Some(object) if object.is::<Promise>() => object.clone(),
        _ => return Ok(value),
    };
    let promise = JsPromise::from_object(promise)
        .map_err(|err| InvokeError::InvalidResult(describe_error(&err, context)))?;
    match promise.state() {
        PromiseState::Fulfilled(value) => Ok(value),
        PromiseState::Rejected(reason) => {
            let err = JsError::from_opaque(reason);
            Err(InvokeError::ExecutionFailed(describe_error(&err, context)))
        }
        PromiseState::Pending => Err(InvokeError::Unsettled),
    }
}
