//! Owned reference to one automation object.

use super::AutomationContext;
use crate::dispatch::{self, Dispatch, InvokeError};
use crate::variant::Variant;

/// Exclusive owner of an instantiated object. Releases it exactly once on drop;
/// borrows the context so it cannot outlive it.
pub struct ObjectHandle<'ctx> {
    object: Box<dyn Dispatch>,
    prog_id: String,
    _ctx: &'ctx AutomationContext,
}

impl<'ctx> ObjectHandle<'ctx> {
    pub(super) fn new(ctx: &'ctx AutomationContext, prog_id: &str, object: Box<dyn Dispatch>) -> Self {
        ObjectHandle {
            object,
            prog_id: prog_id.to_string(),
            _ctx: ctx,
        }
    }

    pub fn prog_id(&self) -> &str {
        &self.prog_id
    }

    /// Call `name` through the dispatch client. See [`dispatch::invoke`].
    #[must_use = "the invocation status must be checked"]
    pub fn invoke(&mut self, name: &str, args: &[Variant], result: &mut Variant) -> Result<(), InvokeError> {
        dispatch::invoke(self.object.as_mut(), name, args, result)
    }

    pub fn call(&mut self, name: &str, args: &[Variant]) -> Result<Variant, InvokeError> {
        dispatch::call(self.object.as_mut(), name, args)
    }
}

impl Drop for ObjectHandle<'_> {
    fn drop(&mut self) {
        self.object.release();
        tracing::debug!(prog_id = %self.prog_id, "released automation object");
    }
}

impl std::fmt::Debug for ObjectHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("prog_id", &self.prog_id)
            .finish_non_exhaustive()
    }
}
