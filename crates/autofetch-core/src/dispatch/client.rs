//! Resolve-then-call client for [`Dispatch`] objects.

use super::{Dispatch, DispParams, Fault, HResult, InvokeKind};
use crate::variant::Variant;

/// Failure of one late-bound call. Name resolution and invocation fail separately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    #[error("unknown operation {name:?}: {code}")]
    UnknownOperation { name: String, code: HResult },
    #[error("{name} failed: {fault}")]
    Call { name: String, fault: Fault },
}

impl InvokeError {
    pub fn operation(&self) -> &str {
        match self {
            InvokeError::UnknownOperation { name, .. } | InvokeError::Call { name, .. } => name,
        }
    }

    pub fn code(&self) -> HResult {
        match self {
            InvokeError::UnknownOperation { code, .. } => *code,
            InvokeError::Call { fault, .. } => fault.code,
        }
    }
}

/// Call member `name` on `object` with `args` packed in reverse declaration order.
///
/// `result` is cleared before anything else happens, so it is in a defined state
/// whether or not the call succeeds. The returned status must be checked; this
/// function never panics on object failure.
#[must_use = "the invocation status must be checked"]
pub fn invoke(
    object: &mut dyn Dispatch,
    name: &str,
    args: &[Variant],
    result: &mut Variant,
) -> Result<(), InvokeError> {
    result.clear();

    let id = object
        .id_of_name(name)
        .map_err(|code| InvokeError::UnknownOperation {
            name: name.to_string(),
            code,
        })?;

    let params = DispParams::positional(args);
    tracing::trace!(
        operation = name,
        dispid = id.0,
        args = params.arg_count(),
        "invoke"
    );
    object
        .invoke(id, InvokeKind::MethodOrPropertyGet, &params, result)
        .map_err(|fault| InvokeError::Call {
            name: name.to_string(),
            fault,
        })
}

/// Like [`invoke`] but returns the result by value.
pub fn call(object: &mut dyn Dispatch, name: &str, args: &[Variant]) -> Result<Variant, InvokeError> {
    let mut result = Variant::Empty;
    invoke(object, name, args, &mut result)?;
    Ok(result)
}
