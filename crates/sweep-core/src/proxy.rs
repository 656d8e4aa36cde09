use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    Socks5,
    Socks4,
    Http,
}

impl ProxyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyKind::Socks5 => "socks5",
            ProxyKind::Socks4 => "socks4",
            ProxyKind::Http => "http",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

/// Connection proxy for a single account.
///
/// Stored on disk as `kind,host,port` or `kind,host,port,username,password`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,
    pub credentials: Option<ProxyCredentials>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyParseError {
    #[error("expected 3 or 5 comma-separated fields, got {0}")]
    FieldCount(usize),

    #[error("unknown proxy type: {0}")]
    UnknownKind(String),

    #[error("proxy host is empty")]
    EmptyHost,

    #[error("invalid proxy port: {0}")]
    InvalidPort(String),

    #[error("proxy {0} must not contain a comma")]
    Delimiter(&'static str),
}

impl Proxy {
    /// Checks that the proxy survives the flat stored format unchanged.
    pub fn validate(&self) -> Result<(), ProxyParseError> {
        if self.host.trim().is_empty() {
            return Err(ProxyParseError::EmptyHost);
        }
        if self.host.contains(',') {
            return Err(ProxyParseError::Delimiter("host"));
        }
        if let Some(creds) = &self.credentials {
            if creds.username.contains(',') {
                return Err(ProxyParseError::Delimiter("username"));
            }
            if creds.password.contains(',') {
                return Err(ProxyParseError::Delimiter("password"));
            }
        }
        Ok(())
    }
}

impl FromStr for ProxyKind {
    type Err = ProxyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "socks5" => Ok(ProxyKind::Socks5),
            "socks4" => Ok(ProxyKind::Socks4),
            "http" => Ok(ProxyKind::Http),
            other => Err(ProxyParseError::UnknownKind(other.to_string())),
        }
    }
}

impl FromStr for Proxy {
    type Err = ProxyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Credentials are taken verbatim; only the address part is trimmed.
        let fields: Vec<&str> = s.trim_end_matches(['\r', '\n']).split(',').collect();
        if fields.len() != 3 && fields.len() != 5 {
            return Err(ProxyParseError::FieldCount(fields.len()));
        }

        let kind = fields[0].parse()?;
        let host = fields[1].trim();
        if host.is_empty() {
            return Err(ProxyParseError::EmptyHost);
        }
        let port = fields[2]
            .trim()
            .parse::<u16>()
            .map_err(|_| ProxyParseError::InvalidPort(fields[2].trim().to_string()))?;

        let credentials = if fields.len() == 5 {
            Some(ProxyCredentials {
                username: fields[3].to_string(),
                password: fields[4].to_string(),
            })
        } else {
            None
        };

        Ok(Proxy {
            kind,
            host: host.to_string(),
            port,
            credentials,
        })
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.kind.as_str(), self.host, self.port)?;
        if let Some(creds) = &self.credentials {
            write!(f, ",{},{}", creds.username, creds.password)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_without_credentials() {
        let proxy: Proxy = "socks5,127.0.0.1,1080".parse().unwrap();
        assert_eq!(proxy.kind, ProxyKind::Socks5);
        assert_eq!(proxy.host, "127.0.0.1");
        assert_eq!(proxy.port, 1080);
        assert!(proxy.credentials.is_none());
    }

    #[test]
    fn test_parse_with_credentials() {
        let proxy: Proxy = "http, proxy.local, 3128,bob,s3cret".parse().unwrap();
        assert_eq!(proxy.kind, ProxyKind::Http);
        assert_eq!(
            proxy.credentials,
            Some(ProxyCredentials {
                username: "bob".into(),
                password: "s3cret".into(),
            })
        );
        assert_eq!(proxy.to_string(), "http,proxy.local,3128,bob,s3cret");
    }

    #[test]
    fn test_credentials_keep_surrounding_spaces() {
        let proxy: Proxy = "socks5,10.0.0.1,1080, bob ,pass word ".parse().unwrap();
        let creds = proxy.credentials.as_ref().unwrap();
        assert_eq!(creds.username, " bob ");
        assert_eq!(creds.password, "pass word ");
        assert_eq!(proxy.to_string().parse::<Proxy>().unwrap(), proxy);
    }

    #[test]
    fn test_validate_rejects_commas() {
        let mut proxy: Proxy = "socks5,10.0.0.1,1080,bob,secret".parse().unwrap();
        assert_eq!(proxy.validate(), Ok(()));

        proxy.credentials = Some(ProxyCredentials {
            username: "bob".into(),
            password: "a,b".into(),
        });
        assert_eq!(proxy.validate(), Err(ProxyParseError::Delimiter("password")));

        proxy.credentials = None;
        proxy.host = "a,b".into();
        assert_eq!(proxy.validate(), Err(ProxyParseError::Delimiter("host")));
    }

    #[test]
    fn test_display_matches_stored_format() {
        let proxy = Proxy {
            kind: ProxyKind::Socks4,
            host: "10.0.0.2".into(),
            port: 9050,
            credentials: None,
        };
        assert_eq!(proxy.to_string(), "socks4,10.0.0.2,9050");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            "socks5,host".parse::<Proxy>(),
            Err(ProxyParseError::FieldCount(2))
        );
        assert_eq!(
            "ftp,host,21".parse::<Proxy>(),
            Err(ProxyParseError::UnknownKind("ftp".into()))
        );
        assert_eq!(
            "socks5,,1080".parse::<Proxy>(),
            Err(ProxyParseError::EmptyHost)
        );
        assert_eq!(
            "socks5,host,70000".parse::<Proxy>(),
            Err(ProxyParseError::InvalidPort("70000".into()))
        );
        assert_eq!(
            "socks5,host,1080,user".parse::<Proxy>(),
            Err(ProxyParseError::FieldCount(4))
        );
    }
}
