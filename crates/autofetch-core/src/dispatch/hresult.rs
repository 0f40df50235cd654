//! Status codes reported by automation objects.

use std::fmt;

/// 32-bit status code. Negative values are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(pub i32);

impl HResult {
    pub const S_OK: HResult = HResult(0);
    pub const E_FAIL: HResult = HResult(0x8000_4005_u32 as i32);
    pub const E_INVALIDARG: HResult = HResult(0x8007_0057_u32 as i32);
    pub const E_NOINTERFACE: HResult = HResult(0x8000_4002_u32 as i32);
    pub const E_OUTOFMEMORY: HResult = HResult(0x8007_000E_u32 as i32);
    pub const CO_E_ALREADYINITIALIZED: HResult = HResult(0x8004_01F1_u32 as i32);
    pub const CO_E_CLASSSTRING: HResult = HResult(0x8004_01F3_u32 as i32);
    pub const REGDB_E_CLASSNOTREG: HResult = HResult(0x8004_0154_u32 as i32);
    pub const DISP_E_MEMBERNOTFOUND: HResult = HResult(0x8002_0003_u32 as i32);
    pub const DISP_E_TYPEMISMATCH: HResult = HResult(0x8002_0005_u32 as i32);
    pub const DISP_E_UNKNOWNNAME: HResult = HResult(0x8002_0006_u32 as i32);
    pub const DISP_E_BADPARAMCOUNT: HResult = HResult(0x8002_000E_u32 as i32);
    /// Request object: `Open` not called yet.
    pub const WINHTTP_CANNOT_CALL_BEFORE_OPEN: HResult = HResult(0x8007_2F44_u32 as i32);
    /// Request object: `Send` not completed yet.
    pub const WINHTTP_CANNOT_CALL_BEFORE_SEND: HResult = HResult(0x8007_2F45_u32 as i32);
    /// Request object: transport failure during `Send`.
    pub const WINHTTP_CONNECTION_ERROR: HResult = HResult(0x8007_2EFE_u32 as i32);
    /// Request object: URL could not be parsed.
    pub const WINHTTP_INVALID_URL: HResult = HResult(0x8007_2EE5_u32 as i32);

    pub fn is_failure(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0 as u32)
    }
}
