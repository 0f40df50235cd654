//! Built-in HTTP request class, driven by name through [`Dispatch`].
//!
//! Registered as `WinHttp.WinHttpRequest.5.1` and exposes the same member
//! surface (`Open`, `SetOption`, `SetRequestHeader`, `Send`, `Status`,
//! `StatusText`, `ResponseBody`). The transport is libcurl via the `curl` crate.
//! Only synchronous requests are supported; `Send` blocks until the transfer ends.

use crate::automation::ClassId;
use crate::dispatch::{DispId, DispParams, Dispatch, Fault, HResult, InvokeKind};
use crate::variant::Variant;
use std::str;

pub const HTTP_REQUEST_PROG_ID: &str = "WinHttp.WinHttpRequest.5.1";
pub const HTTP_REQUEST_CLASS_ID: ClassId = ClassId(0x2087c2f4_2cef_4953_a8ab_66779b670495);

/// `SetOption` slot holding the SSL error ignore flags.
pub const OPTION_SSL_ERROR_IGNORE_FLAGS: i32 = 4;
/// `SetOption` slot toggling redirect following (on by default).
pub const OPTION_ENABLE_REDIRECTS: i32 = 6;

pub const SSL_ERROR_UNKNOWN_CA: i32 = 0x0100;
pub const SSL_ERROR_CERT_WRONG_USAGE: i32 = 0x0200;
pub const SSL_ERROR_CERT_CN_INVALID: i32 = 0x1000;
pub const SSL_ERROR_CERT_DATE_INVALID: i32 = 0x2000;
/// All four flags: 13056.
pub const SSL_ERROR_IGNORE_ALL: i32 = SSL_ERROR_UNKNOWN_CA
    | SSL_ERROR_CERT_WRONG_USAGE
    | SSL_ERROR_CERT_CN_INVALID
    | SSL_ERROR_CERT_DATE_INVALID;

const MAX_REDIRECTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Member {
    Open,
    SetRequestHeader,
    SetOption,
    Send,
    Status,
    StatusText,
    ResponseBody,
}

const MEMBERS: &[(&str, Member, i32)] = &[
    ("Open", Member::Open, 1),
    ("SetRequestHeader", Member::SetRequestHeader, 2),
    ("SetOption", Member::SetOption, 3),
    ("Send", Member::Send, 4),
    ("Status", Member::Status, 5),
    ("StatusText", Member::StatusText, 6),
    ("ResponseBody", Member::ResponseBody, 7),
];

impl Member {
    fn from_id(id: DispId) -> Option<Member> {
        MEMBERS.iter().find(|(_, _, d)| *d == id.0).map(|(_, m, _)| *m)
    }

    fn is_property(self) -> bool {
        matches!(self, Member::Status | Member::StatusText | Member::ResponseBody)
    }
}

#[derive(Debug, Clone)]
struct OpenedRequest {
    method: String,
    url: url::Url,
    headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Response {
    status: u32,
    status_text: String,
    body: Vec<u8>,
}

/// One HTTP request object. State: closed → opened (`Open`) → answered (`Send`).
#[derive(Debug)]
pub struct HttpRequestObject {
    request: Option<OpenedRequest>,
    response: Option<Response>,
    ssl_ignore_flags: i32,
    follow_redirects: bool,
}

impl Default for HttpRequestObject {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpRequestObject {
    pub fn new() -> Self {
        HttpRequestObject {
            request: None,
            response: None,
            ssl_ignore_flags: 0,
            follow_redirects: true,
        }
    }

    /// Current `SetOption(4, ..)` value.
    pub fn ssl_error_ignore_flags(&self) -> i32 {
        self.ssl_ignore_flags
    }

    fn open(&mut self, params: &DispParams<'_>) -> Result<(), Fault> {
        check_arg_count(params, 2, 3)?;
        let method = arg_str(params, 0)?.trim().to_ascii_uppercase();
        let raw_url = arg_str(params, 1)?;
        let asynchronous = match params.declared(2) {
            None | Some(Variant::Empty) => false,
            Some(v) => coerce_bool(v)?,
        };
        if method.is_empty() {
            return Err(Fault::with_description(HResult::E_INVALIDARG, "empty method"));
        }
        if asynchronous {
            return Err(Fault::with_description(
                HResult::E_INVALIDARG,
                "asynchronous requests are not supported",
            ));
        }
        let url = url::Url::parse(raw_url).map_err(|e| {
            Fault::with_description(HResult::WINHTTP_INVALID_URL, format!("{raw_url}: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Fault::with_description(
                HResult::WINHTTP_INVALID_URL,
                format!("unsupported scheme {:?}", url.scheme()),
            ));
        }
        tracing::debug!(%method, %url, "request opened");
        self.request = Some(OpenedRequest {
            method,
            url,
            headers: Vec::new(),
        });
        self.response = None;
        Ok(())
    }

    fn set_request_header(&mut self, params: &DispParams<'_>) -> Result<(), Fault> {
        check_arg_count(params, 2, 2)?;
        let name = arg_str(params, 0)?.trim().to_string();
        let value = arg_str(params, 1)?.trim().to_string();
        let request = self
            .request
            .as_mut()
            .ok_or_else(|| Fault::new(HResult::WINHTTP_CANNOT_CALL_BEFORE_OPEN))?;
        if name.is_empty() || name.contains(':') {
            return Err(Fault::with_description(HResult::E_INVALIDARG, "invalid header name"));
        }
        request.headers.push((name, value));
        Ok(())
    }

    fn set_option(&mut self, params: &DispParams<'_>) -> Result<(), Fault> {
        check_arg_count(params, 2, 2)?;
        let option = arg_i4(params, 0)?;
        let value = params
            .declared(1)
            .ok_or_else(|| Fault::new(HResult::DISP_E_BADPARAMCOUNT))?;
        match option {
            OPTION_SSL_ERROR_IGNORE_FLAGS => {
                let flags = value
                    .as_i4()
                    .ok_or_else(|| Fault::new(HResult::DISP_E_TYPEMISMATCH))?;
                if flags & !SSL_ERROR_IGNORE_ALL != 0 {
                    return Err(Fault::with_description(
                        HResult::E_INVALIDARG,
                        format!("unknown SSL ignore flags 0x{flags:X}"),
                    ));
                }
                self.ssl_ignore_flags = flags;
                tracing::debug!(flags, "SSL error ignore flags set");
            }
            OPTION_ENABLE_REDIRECTS => {
                self.follow_redirects = coerce_bool(value)?;
            }
            other => {
                return Err(Fault::with_description(
                    HResult::E_INVALIDARG,
                    format!("unsupported option {other}"),
                ));
            }
        }
        Ok(())
    }

    fn send(&mut self, params: &DispParams<'_>) -> Result<(), Fault> {
        check_arg_count(params, 0, 1)?;
        let body = match params.declared(0) {
            None | Some(Variant::Empty) => None,
            Some(Variant::Bstr(s)) => Some(s.as_bytes().to_vec()),
            Some(_) => return Err(Fault::new(HResult::DISP_E_TYPEMISMATCH)),
        };
        let request = self
            .request
            .as_ref()
            .ok_or_else(|| Fault::new(HResult::WINHTTP_CANNOT_CALL_BEFORE_OPEN))?;
        let response = perform(request, body.as_deref(), self.ssl_ignore_flags, self.follow_redirects)
            .map_err(|e| {
                tracing::warn!(url = %request.url, "send failed: {}", e);
                Fault::with_description(HResult::WINHTTP_CONNECTION_ERROR, e.to_string())
            })?;
        tracing::debug!(
            status = response.status,
            bytes = response.body.len(),
            "response received"
        );
        self.response = Some(response);
        Ok(())
    }

    fn answered(&self) -> Result<&Response, Fault> {
        self.response
            .as_ref()
            .ok_or_else(|| Fault::new(HResult::WINHTTP_CANNOT_CALL_BEFORE_SEND))
    }
}

impl Dispatch for HttpRequestObject {
    fn id_of_name(&self, name: &str) -> Result<DispId, HResult> {
        MEMBERS
            .iter()
            .find(|(n, _, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, _, id)| DispId(*id))
            .ok_or(HResult::DISP_E_UNKNOWNNAME)
    }

    fn invoke(
        &mut self,
        id: DispId,
        kind: InvokeKind,
        params: &DispParams<'_>,
        result: &mut Variant,
    ) -> Result<(), Fault> {
        let member = Member::from_id(id).ok_or_else(|| Fault::new(HResult::DISP_E_MEMBERNOTFOUND))?;
        let allowed = if member.is_property() {
            kind.allows_property_get()
        } else {
            kind.allows_method()
        };
        if !allowed {
            return Err(Fault::new(HResult::DISP_E_MEMBERNOTFOUND));
        }
        if member.is_property() {
            check_arg_count(params, 0, 0)?;
        }

        match member {
            Member::Open => self.open(params),
            Member::SetRequestHeader => self.set_request_header(params),
            Member::SetOption => self.set_option(params),
            Member::Send => self.send(params),
            Member::Status => {
                *result = Variant::I4(self.answered()?.status as i32);
                Ok(())
            }
            Member::StatusText => {
                *result = Variant::Bstr(self.answered()?.status_text.clone());
                Ok(())
            }
            Member::ResponseBody => {
                let body = self.answered()?.body.clone();
                *result = Variant::from_bytes(body).map_err(|e| {
                    Fault::with_description(HResult::E_OUTOFMEMORY, e.to_string())
                })?;
                Ok(())
            }
        }
    }

    fn release(&mut self) {
        self.request = None;
        self.response = None;
    }
}

fn perform(
    request: &OpenedRequest,
    body: Option<&[u8]>,
    ssl_ignore_flags: i32,
    follow_redirects: bool,
) -> Result<Response, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(request.url.as_str())?;
    match request.method.as_str() {
        "GET" => easy.get(true)?,
        "HEAD" => easy.nobody(true)?,
        "POST" => easy.post(true)?,
        other => easy.custom_request(other)?,
    }
    if let Some(body) = body {
        easy.post_fields_copy(body)?;
    }
    easy.follow_location(follow_redirects)?;
    easy.max_redirections(MAX_REDIRECTS)?;

    let peer_flags = SSL_ERROR_UNKNOWN_CA | SSL_ERROR_CERT_WRONG_USAGE | SSL_ERROR_CERT_DATE_INVALID;
    if ssl_ignore_flags & peer_flags != 0 {
        easy.ssl_verify_peer(false)?;
    }
    if ssl_ignore_flags & SSL_ERROR_CERT_CN_INVALID != 0 {
        easy.ssl_verify_host(false)?;
    }

    if !request.headers.is_empty() {
        let mut list = curl::easy::List::new();
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k, v))?;
        }
        easy.http_headers(list)?;
    }

    let mut data = Vec::new();
    let mut status_text = String::new();
    {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            if let Ok(s) = str::from_utf8(line) {
                if let Some(text) = parse_status_text(s) {
                    status_text = text;
                }
            }
            true
        })?;
        transfer.write_function(|chunk| {
            data.extend_from_slice(chunk);
            Ok(chunk.len())
        })?;
        transfer.perform()?;
    }
    let status = easy.response_code()?;
    Ok(Response {
        status,
        status_text,
        body: data,
    })
}

/// Reason phrase from a status line (`HTTP/1.1 200 OK` → `OK`).
fn parse_status_text(line: &str) -> Option<String> {
    let line = line.trim_end();
    if !line.starts_with("HTTP/") {
        return None;
    }
    let mut parts = line.splitn(3, ' ');
    parts.next()?;
    parts.next()?;
    Some(parts.next().unwrap_or("").trim().to_string())
}

fn check_arg_count(params: &DispParams<'_>, min: usize, max: usize) -> Result<(), Fault> {
    let n = params.arg_count();
    if n < min || n > max {
        return Err(Fault::new(HResult::DISP_E_BADPARAMCOUNT));
    }
    Ok(())
}

fn arg_str<'a>(params: &DispParams<'a>, index: usize) -> Result<&'a str, Fault> {
    params
        .declared(index)
        .ok_or_else(|| Fault::new(HResult::DISP_E_BADPARAMCOUNT))?
        .as_str()
        .ok_or_else(|| Fault::new(HResult::DISP_E_TYPEMISMATCH))
}

fn arg_i4(params: &DispParams<'_>, index: usize) -> Result<i32, Fault> {
    params
        .declared(index)
        .ok_or_else(|| Fault::new(HResult::DISP_E_BADPARAMCOUNT))?
        .as_i4()
        .ok_or_else(|| Fault::new(HResult::DISP_E_TYPEMISMATCH))
}

fn coerce_bool(v: &Variant) -> Result<bool, Fault> {
    match v {
        Variant::Bool(b) => Ok(*b),
        Variant::I4(n) => Ok(*n != 0),
        _ => Err(Fault::new(HResult::DISP_E_TYPEMISMATCH)),
    }
}
