//! Request sequencing against the HTTP request object.
//!
//! Drives one handle through `Open → SetOption → Send → Status → ResponseBody`.
//! Invocation failures are recorded and move the machine to `Failed`, but the
//! remaining operations are still issued; callers judge the outcome from the
//! body's type tag. The handle is released before [`download`] returns.

use crate::automation::{AutomationContext, CreateError, ObjectHandle};
use crate::dispatch::InvokeError;
use crate::http_request::{OPTION_SSL_ERROR_IGNORE_FLAGS, SSL_ERROR_IGNORE_ALL};
use crate::variant::Variant;

pub const OPEN: &str = "Open";
pub const SET_OPTION: &str = "SetOption";
pub const SEND: &str = "Send";
pub const STATUS: &str = "Status";
pub const RESPONSE_BODY: &str = "ResponseBody";

/// Fixed operation order.
pub const OPERATION_ORDER: [&str; 5] = [OPEN, SET_OPTION, SEND, STATUS, RESPONSE_BODY];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Init,
    Opened,
    OptionsSet,
    Sent,
    Completed,
    Failed,
}

/// Result of one request sequence.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub state: DownloadState,
    /// HTTP status, when `Status` returned an integer.
    pub status: Option<i32>,
    /// Whatever `ResponseBody` produced (`Empty` if it failed).
    pub body: Variant,
    /// Every failed invocation, in order.
    pub failures: Vec<InvokeError>,
}

impl DownloadOutcome {
    pub fn is_complete(&self) -> bool {
        self.state == DownloadState::Completed
    }
}

/// Positional block for `Open(method, url, async)`, packed last-to-first.
pub fn open_args(url: &str) -> [Variant; 3] {
    [Variant::Bool(false), Variant::from(url), Variant::from("GET")]
}

/// Positional block for `SetOption(option, value)`, packed last-to-first.
/// Ignores unknown CA, wrong usage, CN mismatch and date errors.
pub fn ssl_option_args() -> [Variant; 2] {
    [
        Variant::I4(SSL_ERROR_IGNORE_ALL),
        Variant::I4(OPTION_SSL_ERROR_IGNORE_FLAGS),
    ]
}

struct Machine<'h, 'ctx> {
    handle: &'h mut ObjectHandle<'ctx>,
    state: DownloadState,
    failures: Vec<InvokeError>,
}

impl Machine<'_, '_> {
    fn advance(&mut self, next: DownloadState, name: &str, args: &[Variant], out: &mut Variant) {
        match self.handle.invoke(name, args, out) {
            Ok(()) => {
                if self.state != DownloadState::Failed {
                    self.state = next;
                }
            }
            Err(e) => {
                tracing::warn!(operation = name, code = %e.code(), "invocation failed: {}", e);
                self.state = DownloadState::Failed;
                self.failures.push(e);
            }
        }
    }
}

/// Run the request sequence for `url` on an already created handle.
pub fn fetch(handle: &mut ObjectHandle<'_>, url: &str) -> DownloadOutcome {
    let mut m = Machine {
        handle,
        state: DownloadState::Init,
        failures: Vec::new(),
    };
    let mut scratch = Variant::Empty;

    m.advance(DownloadState::Opened, OPEN, &open_args(url), &mut scratch);
    m.advance(DownloadState::OptionsSet, SET_OPTION, &ssl_option_args(), &mut scratch);
    m.advance(DownloadState::Sent, SEND, &[], &mut scratch);

    let mut status_value = Variant::Empty;
    m.advance(DownloadState::Sent, STATUS, &[], &mut status_value);
    let status = status_value.as_i4();
    match status {
        Some(code) => tracing::info!(status = code, "HTTP status"),
        None => tracing::debug!(vt = %status_value.vt(), "status not an integer, not reported"),
    }

    let mut body = Variant::Empty;
    m.advance(DownloadState::Completed, RESPONSE_BODY, &[], &mut body);

    DownloadOutcome {
        state: m.state,
        status,
        body,
        failures: m.failures,
    }
}

/// Create an object of `prog_id`, run [`fetch`], and release the object.
pub fn download(ctx: &AutomationContext, prog_id: &str, url: &str) -> Result<DownloadOutcome, CreateError> {
    let mut handle = ctx.create(prog_id)?;
    let outcome = fetch(&mut handle, url);
    drop(handle);
    Ok(outcome)
}
