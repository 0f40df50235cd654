//! Tagged values exchanged with automation objects.
//!
//! A `Variant` carries its own type tag; payloads are only read through the
//! accessor for that tag. Byte arrays keep declared lower/upper bounds, which
//! are authoritative for the element count.

use std::cell::Cell;
use std::fmt;

/// Runtime type tag of a [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Empty,
    Bool,
    I4,
    Bstr,
    ByteArray,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VarType::Empty => "empty",
            VarType::Bool => "bool",
            VarType::I4 => "i4",
            VarType::Bstr => "string",
            VarType::ByteArray => "byte array",
        };
        f.write_str(name)
    }
}

/// A value passed to or returned from a late-bound call.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Variant {
    /// No value ("absent"). Also the cleared state of result storage.
    #[default]
    Empty,
    Bool(bool),
    I4(i32),
    Bstr(String),
    /// One-dimensional byte array. `None` is a null array.
    ByteArray(Option<SafeArray>),
}

/// Error returned when a variant is read under the wrong tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("type mismatch: expected {expected}, found {found}")]
pub struct TypeMismatch {
    pub expected: VarType,
    pub found: VarType,
}

impl Variant {
    pub fn vt(&self) -> VarType {
        match self {
            Variant::Empty => VarType::Empty,
            Variant::Bool(_) => VarType::Bool,
            Variant::I4(_) => VarType::I4,
            Variant::Bstr(_) => VarType::Bstr,
            Variant::ByteArray(_) => VarType::ByteArray,
        }
    }

    /// Reset to `Empty`, dropping any owned payload.
    pub fn clear(&mut self) {
        *self = Variant::Empty;
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i4(&self) -> Option<i32> {
        match self {
            Variant::I4(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::Bstr(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Borrow the byte array. Fails for any other tag; a null array yields `Ok(None)`.
    pub fn byte_array(&self) -> Result<Option<&SafeArray>, TypeMismatch> {
        match self {
            Variant::ByteArray(arr) => Ok(arr.as_ref()),
            other => Err(TypeMismatch {
                expected: VarType::ByteArray,
                found: other.vt(),
            }),
        }
    }

    /// Wrap `bytes` as a zero-based byte array.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, BoundsError> {
        Ok(Variant::ByteArray(Some(SafeArray::from_vec(bytes)?)))
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Bool(v)
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Variant::I4(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::Bstr(v.to_string())
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::Bstr(v)
    }
}

/// Invalid bounds or a buffer too small for the declared bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoundsError {
    #[error("upper bound {upper} is below lower bound {lower} - 1")]
    Inverted { lower: i32, upper: i32 },
    #[error("bounds [{lower}, {upper}] exceed buffer of {available} bytes")]
    Overrun { lower: i32, upper: i32, available: usize },
    #[error("{len} bytes do not fit in a zero-based array")]
    TooLarge { len: usize },
}

/// One-dimensional byte array with declared bounds.
#[derive(Debug)]
pub struct SafeArray {
    data: Vec<u8>,
    lower: i32,
    upper: i32,
    locks: Cell<u32>,
}

impl SafeArray {
    /// Zero-based array covering all of `data`.
    pub fn from_vec(data: Vec<u8>) -> Result<Self, BoundsError> {
        let upper = zero_based_upper(data.len())?;
        Ok(SafeArray {
            data,
            lower: 0,
            upper,
            locks: Cell::new(0),
        })
    }

    /// Array with explicit bounds. The buffer must hold at least `upper - lower + 1` bytes.
    pub fn with_bounds(data: Vec<u8>, lower: i32, upper: i32) -> Result<Self, BoundsError> {
        let arr = SafeArray {
            data,
            lower,
            upper,
            locks: Cell::new(0),
        };
        arr.element_count()?;
        Ok(arr)
    }

    pub fn lower_bound(&self) -> i32 {
        self.lower
    }

    pub fn upper_bound(&self) -> i32 {
        self.upper
    }

    /// `upper - lower + 1`, validated against the backing buffer.
    pub fn element_count(&self) -> Result<usize, BoundsError> {
        let count = i64::from(self.upper) - i64::from(self.lower) + 1;
        if count < 0 {
            return Err(BoundsError::Inverted {
                lower: self.lower,
                upper: self.upper,
            });
        }
        let count = count as usize;
        if count > self.data.len() {
            return Err(BoundsError::Overrun {
                lower: self.lower,
                upper: self.upper,
                available: self.data.len(),
            });
        }
        Ok(count)
    }

    /// Lock the array for direct access. The lock is released when the guard drops.
    pub fn access(&self) -> ArrayAccess<'_> {
        self.locks.set(self.locks.get() + 1);
        ArrayAccess { array: self }
    }

    /// Number of outstanding access guards.
    pub fn lock_count(&self) -> u32 {
        self.locks.get()
    }
}

impl Clone for SafeArray {
    fn clone(&self) -> Self {
        SafeArray {
            data: self.data.clone(),
            lower: self.lower,
            upper: self.upper,
            locks: Cell::new(0),
        }
    }
}

impl PartialEq for SafeArray {
    fn eq(&self, other: &Self) -> bool {
        self.lower == other.lower && self.upper == other.upper && self.data == other.data
    }
}

/// Upper bound of a zero-based array of `len` elements (`len - 1`).
fn zero_based_upper(len: usize) -> Result<i32, BoundsError> {
    i32::try_from(len)
        .map(|n| n - 1)
        .map_err(|_| BoundsError::TooLarge { len })
}

/// Scoped access lock on a [`SafeArray`].
pub struct ArrayAccess<'a> {
    array: &'a SafeArray,
}

impl ArrayAccess<'_> {
    /// The bytes covered by the declared bounds.
    pub fn bytes(&self) -> Result<&[u8], BoundsError> {
        let count = self.array.element_count()?;
        Ok(&self.array.data[..count])
    }
}

impl Drop for ArrayAccess<'_> {
    fn drop(&mut self) {
        let n = self.array.locks.get();
        self.array.locks.set(n.saturating_sub(1));
    }
}
