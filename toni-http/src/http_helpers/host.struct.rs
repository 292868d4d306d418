use std::fmt;

/// Host component of a request: a name plus an optional port.
///
/// IPv6 literals keep their brackets in `name` (`[::1]`), so `Display`
/// always reproduces the wire form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Host {
    name: String,
    port: Option<u16>,
}

impl Host {
    pub fn new(name: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }

    /// Parse a `Host` header value such as `example.com:8080` or `[::1]:443`.
    ///
    /// Parsing never fails: anything that does not look like `name:port`
    /// is kept verbatim as the name.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();

        if value.starts_with('[') {
            if let Some(end) = value.find(']') {
                let (name, rest) = value.split_at(end + 1);
                if let Some(port) = rest.strip_prefix(':').and_then(|p| p.parse().ok()) {
                    return Self::new(name, Some(port));
                }
                if rest.is_empty() {
                    return Self::new(name, None);
                }
            }
            return Self::new(value, None);
        }

        match value.rsplit_once(':') {
            Some((name, port)) if !name.contains(':') => match port.parse() {
                Ok(port) => Self::new(name, Some(port)),
                Err(_) => Self::new(value, None),
            },
            _ => Self::new(value, None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.name, port),
            None => f.write_str(&self.name),
        }
    }
}

impl From<&str> for Host {
    fn from(value: &str) -> Self {
        Host::parse(value)
    }
}
