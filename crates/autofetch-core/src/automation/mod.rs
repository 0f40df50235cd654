//! Automation context, class registry and owned object handles.
//!
//! `AutomationContext` is the per-thread initialization scope (one per thread,
//! torn down on drop). It owns the [`ClassRegistry`] that maps well-known
//! names to class ids and class ids to factories. Objects come back as
//! [`ObjectHandle`]s that borrow the context and release the object on drop.

mod context;
mod handle;
mod registry;

pub use context::AutomationContext;
pub use handle::ObjectHandle;
pub use registry::{ClassFactory, ClassId, ClassRegistry};

use crate::dispatch::HResult;

/// Failure to bring up the context or create an object. Each step reports separately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreateError {
    #[error("failed to initialize automation context: {0}")]
    Init(HResult),
    #[error("class lookup failed for {prog_id:?}: {code}")]
    ClassNotRegistered { prog_id: String, code: HResult },
    #[error("failed to create instance of {class_id}: {code}")]
    Instantiation { class_id: ClassId, code: HResult },
}
