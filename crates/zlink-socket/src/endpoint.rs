use std::str::FromStr;

use crate::error::SocketError;

/// A parsed connection endpoint.
///
/// Every scheme the wire protocol names is represented here so a caller
/// gets a clean `Unsupported` error instead of a panic or a silent
/// no-op; only `Tcp` is backed by a real transport in this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(String),
    Inproc(String),
    Ipc(String),
    Tls(String),
    Ws(String),
    Wss(String),
}

impl Endpoint {
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        match self {
            Endpoint::Tcp(_) => "tcp",
            Endpoint::Inproc(_) => "inproc",
            Endpoint::Ipc(_) => "ipc",
            Endpoint::Tls(_) => "tls",
            Endpoint::Ws(_) => "ws",
            Endpoint::Wss(_) => "wss",
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        match self {
            Endpoint::Tcp(a)
            | Endpoint::Inproc(a)
            | Endpoint::Ipc(a)
            | Endpoint::Tls(a)
            | Endpoint::Ws(a)
            | Endpoint::Wss(a) => a,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme(), self.address())
    }
}

impl FromStr for Endpoint {
    type Err = SocketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| SocketError::InvalidEndpoint(s.to_string()))?;
        if rest.is_empty() {
            return Err(SocketError::InvalidEndpoint(s.to_string()));
        }
        let rest = rest.to_string();
        match scheme {
            "tcp" => Ok(Endpoint::Tcp(rest)),
            "inproc" => Ok(Endpoint::Inproc(rest)),
            "ipc" => Ok(Endpoint::Ipc(rest)),
            "tls" => Ok(Endpoint::Tls(rest)),
            "ws" => Ok(Endpoint::Ws(rest)),
            "wss" => Ok(Endpoint::Wss(rest)),
            _ => Err(SocketError::InvalidEndpoint(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_named_scheme() {
        assert_eq!("tcp://127.0.0.1:5555".parse::<Endpoint>().unwrap(), Endpoint::Tcp("127.0.0.1:5555".into()));
        assert_eq!("inproc://bus".parse::<Endpoint>().unwrap(), Endpoint::Inproc("bus".into()));
        assert_eq!("ipc:///tmp/sock".parse::<Endpoint>().unwrap(), Endpoint::Ipc("/tmp/sock".into()));
        assert_eq!("tls://example.com:443".parse::<Endpoint>().unwrap(), Endpoint::Tls("example.com:443".into()));
        assert_eq!("ws://example.com/socket".parse::<Endpoint>().unwrap(), Endpoint::Ws("example.com/socket".into()));
        assert_eq!("wss://example.com/socket".parse::<Endpoint>().unwrap(), Endpoint::Wss("example.com/socket".into()));
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!("udp://127.0.0.1:1".parse::<Endpoint>().is_err());
    }

    #[test]
    fn rejects_missing_scheme_separator() {
        assert!("127.0.0.1:5555".parse::<Endpoint>().is_err());
    }
}
