//! Late-bound dispatch: objects whose callable surface is discovered by name at runtime.
//!
//! An object implements [`Dispatch`]: it resolves member names to [`DispId`]s and
//! invokes a member with a positional [`DispParams`] block. Callers never talk to
//! objects directly; they go through [`client::invoke`], which owns the
//! resolve-then-call protocol and the result-storage contract.

mod client;
mod hresult;

pub use client::{call, invoke, InvokeError};
pub use hresult::HResult;

use crate::variant::Variant;
use std::fmt;

/// Opaque member identifier produced by name resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispId(pub i32);

/// How a member is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Method,
    PropertyGet,
    /// Either a method call or a property read; the object decides.
    MethodOrPropertyGet,
}

impl InvokeKind {
    pub fn allows_method(self) -> bool {
        matches!(self, InvokeKind::Method | InvokeKind::MethodOrPropertyGet)
    }

    pub fn allows_property_get(self) -> bool {
        matches!(self, InvokeKind::PropertyGet | InvokeKind::MethodOrPropertyGet)
    }
}

/// Positional parameter block.
///
/// Arguments are stored in reverse declaration order: `args[0]` is the member's
/// last declared parameter. Named arguments are not supported.
#[derive(Debug, Clone, Copy)]
pub struct DispParams<'a> {
    args: &'a [Variant],
}

impl<'a> DispParams<'a> {
    pub fn positional(args: &'a [Variant]) -> Self {
        DispParams { args }
    }

    pub fn none() -> Self {
        DispParams { args: &[] }
    }

    /// Number of positional arguments (`cArgs`).
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Always zero.
    pub fn named_arg_count(&self) -> usize {
        0
    }

    /// Raw block in the order the caller packed it.
    pub fn raw(&self) -> &'a [Variant] {
        self.args
    }

    /// Argument by declared position (0 = first declared parameter).
    pub fn declared(&self, index: usize) -> Option<&'a Variant> {
        let n = self.args.len();
        if index >= n {
            return None;
        }
        self.args.get(n - 1 - index)
    }
}

/// Failure reported by an object's `invoke`, with an optional description (like EXCEPINFO).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: HResult,
    pub description: Option<String>,
}

impl Fault {
    pub fn new(code: HResult) -> Self {
        Fault {
            code,
            description: None,
        }
    }

    pub fn with_description(code: HResult, description: impl Into<String>) -> Self {
        Fault {
            code,
            description: Some(description.into()),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(d) => write!(f, "{} ({})", self.code, d),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for Fault {}

/// An object that can be driven by name at runtime.
pub trait Dispatch {
    /// Resolve a member name to its identifier. Unknown names yield
    /// [`HResult::DISP_E_UNKNOWNNAME`].
    fn id_of_name(&self, name: &str) -> Result<DispId, HResult>;

    /// Invoke member `id`, writing its return value (if any) into `result`.
    fn invoke(
        &mut self,
        id: DispId,
        kind: InvokeKind,
        params: &DispParams<'_>,
        result: &mut Variant,
    ) -> Result<(), Fault>;

    /// Called exactly once when the owning handle is dropped.
    fn release(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_reverses_packed_order() {
        let args = [Variant::Bool(false), Variant::from("https://a/"), Variant::from("GET")];
        let p = DispParams::positional(&args);
        assert_eq!(p.arg_count(), 3);
        assert_eq!(p.named_arg_count(), 0);
        assert_eq!(p.declared(0), Some(&Variant::from("GET")));
        assert_eq!(p.declared(1), Some(&Variant::from("https://a/")));
        assert_eq!(p.declared(2), Some(&Variant::Bool(false)));
        assert_eq!(p.declared(3), None);
    }

    #[test]
    fn invoke_kind_modes() {
        assert!(InvokeKind::MethodOrPropertyGet.allows_method());
        assert!(InvokeKind::MethodOrPropertyGet.allows_property_get());
        assert!(!InvokeKind::Method.allows_property_get());
        assert!(!InvokeKind::PropertyGet.allows_method());
    }
}
