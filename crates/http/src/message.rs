//! The HTTP object model flowing through codec stages.
//!
//! A decoded HTTP/1 exchange arrives as a headers-bearing *head*, zero or
//! more *content* chunks, and exactly one *last content* closing the message
//! (possibly carrying trailing headers). A *full* message is head and final
//! content in one object. Every object carries the decoder result of the
//! stage that produced it.

use std::fmt;

use buffer::{BufAllocator, ByteBuf};
use pipeline::{Cause, ReferenceCounted};

use crate::headers::HeaderMap;

/// HTTP protocol version.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HttpVersion {
    major: u8,
    minor: u8,
}

impl HttpVersion {
    /// `HTTP/1.0`
    pub const HTTP_1_0: Self = Self { major: 1, minor: 0 };
    /// `HTTP/1.1`
    pub const HTTP_1_1: Self = Self { major: 1, minor: 1 };
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// Request method.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    /// `GET`
    Get,
    /// `HEAD`
    Head,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `OPTIONS`
    Options,
    /// `PATCH`
    Patch,
    /// `TRACE`
    Trace,
    /// `CONNECT`
    Connect,
}

impl Method {
    /// The wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Trace => "TRACE",
            Self::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response status code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusCode(u16);

impl StatusCode {
    /// `100 Continue`
    pub const CONTINUE: Self = Self(100);
    /// `101 Switching Protocols`
    pub const SWITCHING_PROTOCOLS: Self = Self(101);
    /// `200 OK`
    pub const OK: Self = Self(200);
    /// `400 Bad Request`
    pub const BAD_REQUEST: Self = Self(400);

    /// Creates a status code from its numeric value.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// The numeric value.
    #[must_use]
    pub const fn code(self) -> u16 {
        self.0
    }

    fn reason(self) -> &'static str {
        match self.0 {
            100 => "Continue",
            101 => "Switching Protocols",
            200 => "OK",
            400 => "Bad Request",
            _ => "",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = self.reason();
        if reason.is_empty() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "{} {}", self.0, reason)
        }
    }
}

/// Outcome of the decoder stage that produced an object.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum DecoderResult {
    /// The object was decoded cleanly.
    #[default]
    Success,
    /// Decoding failed; the message describes the cause.
    Failure(String),
}

impl DecoderResult {
    /// `true` for [`DecoderResult::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Request line plus headers.
#[derive(Clone, Debug)]
pub struct RequestHead {
    /// Protocol version.
    pub version: HttpVersion,
    /// Request method.
    pub method: Method,
    /// Request target.
    pub uri: String,
    /// Header map.
    pub headers: HeaderMap,
    /// Result of the stage that decoded this head.
    pub decoder_result: DecoderResult,
}

impl RequestHead {
    /// Creates an `HTTP/1.1` request head with empty headers.
    #[must_use]
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            version: HttpVersion::HTTP_1_1,
            method,
            uri: uri.into(),
            headers: HeaderMap::new(),
            decoder_result: DecoderResult::Success,
        }
    }
}

/// Status line plus headers.
#[derive(Clone, Debug)]
pub struct ResponseHead {
    /// Protocol version.
    pub version: HttpVersion,
    /// Response status.
    pub status: StatusCode,
    /// Header map.
    pub headers: HeaderMap,
    /// Result of the stage that decoded this head.
    pub decoder_result: DecoderResult,
}

impl ResponseHead {
    /// Creates an `HTTP/1.1` response head with empty headers.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            version: HttpVersion::HTTP_1_1,
            status,
            headers: HeaderMap::new(),
            decoder_result: DecoderResult::Success,
        }
    }
}

/// One body chunk.
#[derive(Debug)]
pub struct HttpContent {
    /// Payload buffer; this object owns one reference.
    pub data: ByteBuf,
    /// Result of the stage that decoded this chunk.
    pub decoder_result: DecoderResult,
}

impl HttpContent {
    /// Wraps a payload buffer.
    #[must_use]
    pub fn new(data: ByteBuf) -> Self {
        Self {
            data,
            decoder_result: DecoderResult::Success,
        }
    }
}

/// The chunk closing a message, optionally carrying trailing headers.
#[derive(Debug)]
pub struct LastHttpContent {
    /// Final payload bytes, possibly empty.
    pub data: ByteBuf,
    /// Trailing headers, empty for most messages.
    pub trailing_headers: HeaderMap,
    /// Result of the stage that decoded this chunk.
    pub decoder_result: DecoderResult,
}

impl LastHttpContent {
    /// Creates a last-content chunk.
    #[must_use]
    pub fn new(data: ByteBuf, trailing_headers: HeaderMap) -> Self {
        Self {
            data,
            trailing_headers,
            decoder_result: DecoderResult::Success,
        }
    }

    /// An empty terminator without trailers.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(BufAllocator::new().empty(), HeaderMap::new())
    }
}

/// Head and final content in one object.
#[derive(Debug)]
pub struct FullRequest {
    /// Request line and headers.
    pub head: RequestHead,
    /// Entire body.
    pub body: ByteBuf,
    /// Trailing headers.
    pub trailing_headers: HeaderMap,
}

impl FullRequest {
    /// Assembles a full request.
    #[must_use]
    pub fn new(head: RequestHead, body: ByteBuf) -> Self {
        Self {
            head,
            body,
            trailing_headers: HeaderMap::new(),
        }
    }
}

/// Head and final content in one object.
#[derive(Debug)]
pub struct FullResponse {
    /// Status line and headers.
    pub head: ResponseHead,
    /// Entire body.
    pub body: ByteBuf,
    /// Trailing headers.
    pub trailing_headers: HeaderMap,
}

impl FullResponse {
    /// Assembles a full response.
    #[must_use]
    pub fn new(head: ResponseHead, body: ByteBuf) -> Self {
        Self {
            head,
            body,
            trailing_headers: HeaderMap::new(),
        }
    }
}

/// Union of everything an HTTP pipeline stage moves.
#[derive(Debug)]
pub enum HttpObject {
    /// Request line plus headers.
    RequestHead(RequestHead),
    /// Status line plus headers.
    ResponseHead(ResponseHead),
    /// Body chunk.
    Content(HttpContent),
    /// Terminating body chunk.
    LastContent(LastHttpContent),
    /// Full request.
    FullRequest(FullRequest),
    /// Full response.
    FullResponse(FullResponse),
}

impl HttpObject {
    /// `true` for objects that terminate a message.
    #[must_use]
    pub const fn is_last_content(&self) -> bool {
        matches!(
            self,
            Self::LastContent(_) | Self::FullRequest(_) | Self::FullResponse(_)
        )
    }

    /// The header map of headers-bearing objects.
    #[must_use]
    pub const fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Self::RequestHead(head) => Some(&head.headers),
            Self::ResponseHead(head) => Some(&head.headers),
            Self::FullRequest(full) => Some(&full.head.headers),
            Self::FullResponse(full) => Some(&full.head.headers),
            Self::Content(_) | Self::LastContent(_) => None,
        }
    }

    /// Mutable access to the header map of headers-bearing objects.
    pub fn headers_mut(&mut self) -> Option<&mut HeaderMap> {
        match self {
            Self::RequestHead(head) => Some(&mut head.headers),
            Self::ResponseHead(head) => Some(&mut head.headers),
            Self::FullRequest(full) => Some(&mut full.head.headers),
            Self::FullResponse(full) => Some(&mut full.head.headers),
            Self::Content(_) | Self::LastContent(_) => None,
        }
    }

    /// The payload buffer of content-bearing objects.
    #[must_use]
    pub const fn payload(&self) -> Option<&ByteBuf> {
        match self {
            Self::Content(content) => Some(&content.data),
            Self::LastContent(last) => Some(&last.data),
            Self::FullRequest(full) => Some(&full.body),
            Self::FullResponse(full) => Some(&full.body),
            Self::RequestHead(_) | Self::ResponseHead(_) => None,
        }
    }

    /// The decoder result carried by this object.
    #[must_use]
    pub const fn decoder_result(&self) -> &DecoderResult {
        match self {
            Self::RequestHead(head) => &head.decoder_result,
            Self::ResponseHead(head) => &head.decoder_result,
            Self::Content(content) => &content.decoder_result,
            Self::LastContent(last) => &last.decoder_result,
            Self::FullRequest(full) => &full.head.decoder_result,
            Self::FullResponse(full) => &full.head.decoder_result,
        }
    }
}

impl ReferenceCounted for HttpObject {
    fn retain(&self) -> Result<(), Cause> {
        match self.payload() {
            Some(data) => ReferenceCounted::retain(data),
            None => Ok(()),
        }
    }

    fn release(&self) -> Result<bool, Cause> {
        match self.payload() {
            Some(data) => ReferenceCounted::release(data),
            None => Ok(false),
        }
    }

    fn ref_count(&self) -> usize {
        self.payload().map_or(1, ByteBuf::ref_count)
    }
}
