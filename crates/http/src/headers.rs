//! Ordered, case-insensitive HTTP header multimap.
//!
//! Names compare ASCII case-insensitively but are stored as given. Adding
//! preserves insertion order per name; lookup returns the first occurrence.
//! Values are opaque byte sequences — HTTP permits obs-text outside ASCII —
//! with `str` conveniences for the common case.

/// Well-known header names, stored lowercase.
pub mod names {
    /// `Connection`
    pub const CONNECTION: &str = "connection";
    /// `Content-Encoding`
    pub const CONTENT_ENCODING: &str = "content-encoding";
    /// `Content-Length`
    pub const CONTENT_LENGTH: &str = "content-length";
    /// `Sec-WebSocket-Accept`
    pub const SEC_WEBSOCKET_ACCEPT: &str = "sec-websocket-accept";
    /// `Sec-WebSocket-Key`
    pub const SEC_WEBSOCKET_KEY: &str = "sec-websocket-key";
    /// `Sec-WebSocket-Protocol`
    pub const SEC_WEBSOCKET_PROTOCOL: &str = "sec-websocket-protocol";
    /// `Sec-WebSocket-Version`
    pub const SEC_WEBSOCKET_VERSION: &str = "sec-websocket-version";
    /// `Transfer-Encoding`
    pub const TRANSFER_ENCODING: &str = "transfer-encoding";
    /// `Upgrade`
    pub const UPGRADE: &str = "upgrade";
}

/// Well-known header values.
pub mod values {
    /// `chunked`
    pub const CHUNKED: &str = "chunked";
    /// `deflate`
    pub const DEFLATE: &str = "deflate";
    /// `gzip`
    pub const GZIP: &str = "gzip";
    /// `identity`
    pub const IDENTITY: &str = "identity";
    /// `Upgrade`
    pub const UPGRADE: &str = "Upgrade";
    /// `websocket`
    pub const WEBSOCKET: &str = "websocket";
}

/// Ordered multimap of HTTP headers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, Vec<u8>)>,
}

impl HeaderMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a header, keeping earlier occurrences of the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces every occurrence of `name` with a single entry.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    /// First value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// First value for `name` as UTF-8, if any and valid.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Every value for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// Removes every occurrence of `name`; returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before - self.entries.len()
    }

    /// `true` when at least one occurrence of `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of entries across all names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no entries exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Appends every entry of `other`, in its order.
    pub fn extend_from(&mut self, other: &Self) {
        for (name, value) in other.iter() {
            self.add(name, value);
        }
    }
}
