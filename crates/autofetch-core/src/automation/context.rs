//! Per-thread automation context.

use super::{ClassRegistry, CreateError, ObjectHandle};
use crate::dispatch::HResult;
use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static INITIALIZED: Cell<bool> = const { Cell::new(false) };
}

/// Initialization scope for automation objects on the current thread.
///
/// At most one context exists per thread; it is torn down when dropped. Not `Send`:
/// objects created here must be used and released on the same thread.
#[derive(Debug)]
pub struct AutomationContext {
    registry: ClassRegistry,
    _not_send: PhantomData<*const ()>,
}

impl AutomationContext {
    /// Initialize the context for this thread with the given class registry.
    pub fn initialize(registry: ClassRegistry) -> Result<Self, CreateError> {
        let already = INITIALIZED.with(|flag| flag.replace(true));
        if already {
            return Err(CreateError::Init(HResult::CO_E_ALREADYINITIALIZED));
        }
        tracing::debug!("automation context initialized");
        Ok(AutomationContext {
            registry,
            _not_send: PhantomData,
        })
    }

    /// Look up `prog_id`, instantiate the class, and wrap it in an owned handle.
    pub fn create(&self, prog_id: &str) -> Result<ObjectHandle<'_>, CreateError> {
        let class_id = self
            .registry
            .class_id_from_prog_id(prog_id)
            .map_err(|code| CreateError::ClassNotRegistered {
                prog_id: prog_id.to_string(),
                code,
            })?;
        let object = self
            .registry
            .create_instance(class_id)
            .map_err(|code| CreateError::Instantiation { class_id, code })?;
        tracing::debug!(prog_id, %class_id, "created automation object");
        Ok(ObjectHandle::new(self, prog_id, object))
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }
}

impl Drop for AutomationContext {
    fn drop(&mut self) {
        INITIALIZED.with(|flag| flag.set(false));
        tracing::debug!("automation context torn down");
    }
}
