use std::fmt;

use crate::{Result, SnapSyncError};

/// Transport class of a connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Local,
    Ssh,
    Custom,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Local => write!(f, "local"),
            Protocol::Ssh => write!(f, "ssh"),
            Protocol::Custom => write!(f, "custom"),
        }
    }
}

/// A parsed connection URL.
///
/// Local URLs only carry `path`. SSH URLs are SCP-style
/// (`[user@]host[:port]:path`) with port 0 meaning unspecified. Custom URLs
/// are opaque: the entire original string is preserved in `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub protocol: Protocol,
    pub username: String,
    pub hostname: String,
    pub port: u16,
    pub path: String,
}

impl Url {
    fn local(path: &str) -> Self {
        Self {
            protocol: Protocol::Local,
            username: String::new(),
            hostname: String::new(),
            port: 0,
            path: path.to_owned(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(invalid(raw, "empty URL"));
        }

        // Scheme-prefixed URLs are treated as opaque custom URLs, but only if
        // the scheme matches [A-Za-z][A-Za-z0-9+.-]*.
        if let Some(index) = raw.find("://") {
            if !is_valid_scheme(&raw[..index]) {
                return Err(invalid(raw, "invalid custom scheme"));
            }
            return Ok(Self {
                protocol: Protocol::Custom,
                username: String::new(),
                hostname: String::new(),
                port: 0,
                path: raw.to_owned(),
            });
        }

        // Split off the username at the first '@'. '@' is ASCII, so byte
        // indices are safe even for multibyte usernames and hostnames.
        let (username, host_and_path) = match raw.find('@') {
            Some(index) => (&raw[..index], &raw[index + 1..]),
            None => ("", raw),
        };

        // Without a colon this is a plain local path, user prefix included.
        let colon = match host_and_path.find(':') {
            Some(index) => index,
            None => return Ok(Self::local(raw)),
        };

        let hostname = &host_and_path[..colon];
        if hostname.is_empty() {
            return Err(invalid(raw, "empty hostname"));
        }

        // The tail may start with "digits:", yielding an optional port. Any
        // component that is not a valid in-range decimal belongs to the path.
        let tail = &host_and_path[colon + 1..];
        let (port, path) = match tail.find(':') {
            Some(index) => match parse_port(&tail[..index]) {
                Some(port) => (port, &tail[index + 1..]),
                None => (0, tail),
            },
            None => (0, tail),
        };

        Ok(Self {
            protocol: Protocol::Ssh,
            username: username.to_owned(),
            hostname: hostname.to_owned(),
            port,
            path: path.to_owned(),
        })
    }
}

fn invalid(url: &str, reason: &str) -> SnapSyncError {
    SnapSyncError::InvalidUrl {
        url: url.to_owned(),
        reason: reason.to_owned(),
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '.' || c == '-')
}

fn parse_port(component: &str) -> Option<u16> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Leading zeros are fine; overflow means it's a path component.
    component
        .parse::<u64>()
        .ok()
        .filter(|&value| value <= u64::from(u16::MAX))
        .map(|value| value as u16)
}

/// Formats a URL back into a reparsable string.
impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            Protocol::Local | Protocol::Custom => write!(f, "{}", self.path),
            Protocol::Ssh => {
                if !self.username.is_empty() {
                    write!(f, "{}@", self.username)?;
                }
                write!(f, "{}", self.hostname)?;
                if self.port != 0 {
                    write!(f, ":{}", self.port)?;
                }
                write!(f, ":{}", self.path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ssh(raw: &str) -> Url {
        let url = Url::parse(raw).expect("parse failed");
        assert_eq!(url.protocol, Protocol::Ssh, "for {raw:?}");
        url
    }

    #[test]
    fn empty_invalid() {
        assert!(Url::parse("").is_err());
    }

    #[test]
    fn empty_hostname_invalid() {
        assert!(Url::parse(":").is_err());
        assert!(Url::parse(":path").is_err());
        assert!(Url::parse("user@:path").is_err());
    }

    #[test]
    fn path_with_colon_after_slash_is_local() {
        let url = Url::parse("/this/is/a:path").unwrap();
        assert_eq!(url.protocol, Protocol::Local);
        assert_eq!(url.path, "/this/is/a:path");
    }

    #[test]
    fn username_hostname_without_colon_is_local() {
        let url = Url::parse("user@host").unwrap();
        assert_eq!(url.protocol, Protocol::Local);
        assert_eq!(url.username, "");
        assert_eq!(url.hostname, "");
        assert_eq!(url.path, "user@host");
    }

    #[test]
    fn hostname_empty_path() {
        let url = parse_ssh("host:");
        assert_eq!(url.hostname, "host");
        assert_eq!(url.path, "");
    }

    #[test]
    fn hostname_path() {
        let url = parse_ssh("host:path");
        assert_eq!(url.username, "");
        assert_eq!(url.hostname, "host");
        assert_eq!(url.port, 0);
        assert_eq!(url.path, "path");
    }

    #[test]
    fn username_hostname_path() {
        let url = parse_ssh("user@host:path");
        assert_eq!(url.username, "user");
        assert_eq!(url.hostname, "host");
        assert_eq!(url.path, "path");
    }

    #[test]
    fn path_with_leading_colon() {
        let url = parse_ssh("user@host::path");
        assert_eq!(url.port, 0);
        assert_eq!(url.path, ":path");
    }

    #[test]
    fn path_with_colon_in_middle() {
        let url = parse_ssh("user@host:pa:th");
        assert_eq!(url.port, 0);
        assert_eq!(url.path, "pa:th");
    }

    #[test]
    fn path_with_colon_at_end() {
        let url = parse_ssh("user@host:path:");
        assert_eq!(url.port, 0);
        assert_eq!(url.path, "path:");
    }

    #[test]
    fn hostname_with_at() {
        let url = parse_ssh("user@ho@st:path");
        assert_eq!(url.username, "user");
        assert_eq!(url.hostname, "ho@st");
        assert_eq!(url.path, "path");
    }

    #[test]
    fn path_with_at() {
        let url = parse_ssh("user@host:pa@th");
        assert_eq!(url.hostname, "host");
        assert_eq!(url.path, "pa@th");
    }

    #[test]
    fn maximum_port() {
        let url = parse_ssh("user@host:65535:path");
        assert_eq!(url.port, 65535);
        assert_eq!(url.path, "path");
    }

    #[test]
    fn zero_port() {
        let url = parse_ssh("user@host:0:path");
        assert_eq!(url.port, 0);
        assert_eq!(url.path, "path");
    }

    #[test]
    fn double_zero_port() {
        let url = parse_ssh("user@host:00:path");
        assert_eq!(url.port, 0);
        assert_eq!(url.path, "path");
    }

    #[test]
    fn out_of_range_port_is_path() {
        let url = parse_ssh("user@host:65536:path");
        assert_eq!(url.port, 0);
        assert_eq!(url.path, "65536:path");
    }

    #[test]
    fn overflowing_port_is_path() {
        let url = parse_ssh("user@host:18446744073709551616:path");
        assert_eq!(url.port, 0);
        assert_eq!(url.path, "18446744073709551616:path");
    }

    #[test]
    fn non_numeric_port_is_path() {
        let url = parse_ssh("user@host:aaa:path");
        assert_eq!(url.port, 0);
        assert_eq!(url.path, "aaa:path");
    }

    #[test]
    fn trailing_port_without_colon_is_path() {
        let url = parse_ssh("host:65535");
        assert_eq!(url.port, 0);
        assert_eq!(url.path, "65535");
    }

    #[test]
    fn unicode_components() {
        let url = parse_ssh("üsér@høst:пат");
        assert_eq!(url.username, "üsér");
        assert_eq!(url.hostname, "høst");
        assert_eq!(url.path, "пат");
    }

    #[test]
    fn unicode_components_with_port() {
        let url = parse_ssh("üsér@høst:23:пат");
        assert_eq!(url.port, 23);
        assert_eq!(url.path, "пат");
    }

    #[test]
    fn custom_scheme() {
        let url = Url::parse("htt-...+p://example.org/").unwrap();
        assert_eq!(url.protocol, Protocol::Custom);
        assert_eq!(url.path, "htt-...+p://example.org/");
    }

    #[test]
    fn custom_scheme_starting_with_digit_invalid() {
        assert!(Url::parse("5http://example.org/").is_err());
    }

    #[test]
    fn format_round_trips() {
        let raws = [
            "/this/is/a:path",
            "user@host",
            "host:path",
            "host:",
            "user@host:path",
            "user@host:65535:path",
            "user@host:aaa:path",
            "user@ho@st:path",
            "üsér@høst:23:пат",
            "htt-...+p://example.org/",
        ];
        for raw in raws {
            let url = Url::parse(raw).unwrap();
            let reparsed = Url::parse(&url.to_string()).unwrap();
            assert_eq!(url, reparsed, "for {raw:?}");
        }
    }
}
