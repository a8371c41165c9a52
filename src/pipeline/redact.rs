//! IP address redaction.
//!
//! Replaces every IPv4 or IPv6 address found in a response body with a fixed
//! token. Matching runs over raw bytes, so non-UTF-8 bodies are handled and
//! everything outside a match is preserved byte for byte.
//!
//! IPv6 addresses with an embedded IPv4 tail are matched as a whole by both
//! redactors, so the two commute on well-formed addresses.

use std::borrow::Cow;
use std::sync::LazyLock;

use axum::http::HeaderMap;
use bytes::Bytes;
use regex::bytes::{NoExpand, Regex};

use crate::pipeline::module::{Modifier, Module};

pub const DEFAULT_REDACTION_TOKEN: &str = "[REDACTED]";

/// Default priority for both redactors: ahead of truncation and compression.
pub const DEFAULT_PRIORITY: i32 = 10;

const HEXTET: &str = "[0-9a-f]{1,4}";

const OCTET: &str = "(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)";

/// IPv6 forms made of hex groups only.
const IPV6_HEX_ONLY: &str = r"([0-9a-f]{1,4}:){7}[0-9a-f]{1,4}|::([0-9a-f]{1,4}:){0,6}[0-9a-f]{1,4}|([0-9a-f]{1,4}:){1,6}:[0-9a-f]{1,4}|([0-9a-f]{1,4}:){1,5}(:[0-9a-f]{1,4}){1,2}|([0-9a-f]{1,4}:){1,4}(:[0-9a-f]{1,4}){1,3}|([0-9a-f]{1,4}:){1,3}(:[0-9a-f]{1,4}){1,4}|([0-9a-f]{1,4}:){1,2}(:[0-9a-f]{1,4}){1,5}|[0-9a-f]{1,4}:((:[0-9a-f]{1,4}){1,6})|:((:[0-9a-f]{1,4}){1,7}|:)";

fn dotted_quad() -> String {
    format!(r"{o}\.{o}\.{o}\.{o}", o = OCTET)
}

/// IPv6 forms ending in a dotted quad (`::ffff:10.0.0.1`, `2001:db8::192.168.1.1`).
///
/// Both patterns lead with these so either redactor consumes the whole
/// address in one match, whichever of them runs first.
fn ipv6_embedded_ipv4() -> String {
    let quad = dotted_quad();
    format!(
        "(?:{h}:){{6}}{quad}|(?:(?:{h}:){{0,5}}{h})?::(?:{h}:){{0,5}}{quad}",
        h = HEXTET
    )
}

static IPV4_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i){}|{}", ipv6_embedded_ipv4(), dotted_quad()))
        .expect("IPv4 pattern is valid")
});

static IPV6_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i){}|{}", ipv6_embedded_ipv4(), IPV6_HEX_ONLY))
        .expect("IPv6 pattern is valid")
});

/// Address family handled by a [`Redactor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    fn pattern(self) -> &'static Regex {
        match self {
            AddressFamily::V4 => &IPV4_PATTERN,
            AddressFamily::V6 => &IPV6_PATTERN,
        }
    }

    pub fn module_name(self) -> &'static str {
        match self {
            AddressFamily::V4 => "ipv4-redactor",
            AddressFamily::V6 => "ipv6-redactor",
        }
    }
}

/// Pattern substitution for one address family.
#[derive(Debug, Clone)]
pub struct Redactor {
    family: AddressFamily,
    pattern: Regex,
    token: Vec<u8>,
}

impl Redactor {
    pub fn new(family: AddressFamily, token: impl Into<Vec<u8>>) -> Self {
        Self {
            family,
            pattern: family.pattern().clone(),
            token: token.into(),
        }
    }

    pub fn ipv4() -> Self {
        Self::new(AddressFamily::V4, DEFAULT_REDACTION_TOKEN)
    }

    pub fn ipv6() -> Self {
        Self::new(AddressFamily::V6, DEFAULT_REDACTION_TOKEN)
    }

    /// Replace every address in `content` with the token.
    pub fn redact(&self, content: Bytes) -> Bytes {
        let redacted = match self.pattern.replace_all(&content, NoExpand(&self.token)) {
            Cow::Borrowed(_) => None,
            Cow::Owned(redacted) => Some(redacted),
        };
        match redacted {
            Some(redacted) => Bytes::from(redacted),
            None => content,
        }
    }

    pub fn into_module(self, priority: i32) -> Module {
        let description = match self.family {
            AddressFamily::V4 => "Redacts IPv4 addresses in content",
            AddressFamily::V6 => "Redacts IPv6 addresses in content",
        };
        Module::new(self.family.module_name(), self)
            .with_description(description)
            .with_version("1.0.1")
            .with_priority(priority)
    }
}

impl Modifier for Redactor {
    fn modify(&self, content: Bytes, _headers: &mut HeaderMap) -> Bytes {
        self.redact(content)
    }
}
