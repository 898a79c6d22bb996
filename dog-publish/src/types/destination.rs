use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{PublishError, PublishResult};

/// Fixed catalogue of transport kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Ftp,
    Email,
    Odbc,
    File,
    Pull,
    HttpPush,
}

impl TransportKind {
    pub const ALL: [TransportKind; 6] = [
        Self::Ftp,
        Self::Email,
        Self::Odbc,
        Self::File,
        Self::Pull,
        Self::HttpPush,
    ];

    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ftp => "ftp",
            Self::Email => "email",
            Self::Odbc => "odbc",
            Self::File => "file",
            Self::Pull => "pull",
            Self::HttpPush => "http_push",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ftp => "FTP",
            Self::Email => "Email",
            Self::Odbc => "ODBC",
            Self::File => "File",
            Self::Pull => "Pull",
            Self::HttpPush => "HTTP Push",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Older records use `ODBC` and `File`
        match s.to_ascii_lowercase().as_str() {
            "ftp" => Ok(Self::Ftp),
            "email" => Ok(Self::Email),
            "odbc" => Ok(Self::Odbc),
            "file" => Ok(Self::File),
            "pull" => Ok(Self::Pull),
            "http_push" => Ok(Self::HttpPush),
            other => Err(PublishError::validation(format!("unknown transport kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtpConfig {
    pub host: String,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_true")]
    pub passive: bool,
}

fn default_ftp_port() -> u16 {
    21
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub recipients: Vec<String>,
    #[serde(default)]
    pub sender: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdbcConfig {
    pub connection_string: String,
    pub stored_procedure: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Directory the payload files are written into
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullConfig {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpPushConfig {
    pub resource_url: String,
    #[serde(default)]
    pub assets_url: Option<String>,
}

/// Transport specific settings; the variant decides the transport kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "delivery_type", content = "config", rename_all = "snake_case")]
pub enum DestinationConfig {
    Ftp(FtpConfig),
    Email(EmailConfig),
    Odbc(OdbcConfig),
    File(FileConfig),
    Pull(PullConfig),
    HttpPush(HttpPushConfig),
}

impl DestinationConfig {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Ftp(_) => TransportKind::Ftp,
            Self::Email(_) => TransportKind::Email,
            Self::Odbc(_) => TransportKind::Odbc,
            Self::File(_) => TransportKind::File,
            Self::Pull(_) => TransportKind::Pull,
            Self::HttpPush(_) => TransportKind::HttpPush,
        }
    }

    /// Check the required fields of the kind's schema
    pub fn validate(&self) -> PublishResult<()> {
        match self {
            Self::Ftp(ftp) => {
                require("ftp host", &ftp.host)?;
                if ftp.port == 0 {
                    return Err(PublishError::validation("ftp port must be non-zero"));
                }
            }
            Self::Email(email) => {
                if email.recipients.is_empty() {
                    return Err(PublishError::validation("email destination needs a recipient"));
                }
                if let Some(bad) = email.recipients.iter().find(|r| !looks_like_address(r)) {
                    return Err(PublishError::validation(format!("invalid recipient address: {bad}")));
                }
                if let Some(sender) = &email.sender {
                    if !looks_like_address(sender) {
                        return Err(PublishError::validation(format!("invalid sender address: {sender}")));
                    }
                }
            }
            Self::Odbc(odbc) => {
                require("odbc connection string", &odbc.connection_string)?;
                require("odbc stored procedure", &odbc.stored_procedure)?;
            }
            Self::File(file) => require("file path", &file.path)?,
            Self::Pull(_) => {}
            Self::HttpPush(http) => {
                require_url("resource url", &http.resource_url)?;
                if let Some(assets) = &http.assets_url {
                    require_url("assets url", assets)?;
                }
            }
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> PublishResult<()> {
    if value.trim().is_empty() {
        return Err(PublishError::validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_url(field: &str, value: &str) -> PublishResult<()> {
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(PublishError::validation(format!("{field} must be an http(s) url")));
    }
    Ok(())
}

fn looks_like_address(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

/// Configured transport endpoint owned by a subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    /// Output format; `None` once a subscriber type change invalidated it
    pub format: Option<String>,
    pub delivery: DestinationConfig,
}

impl Destination {
    pub fn new(name: impl Into<String>, format: impl Into<String>, delivery: DestinationConfig) -> Self {
        Self {
            name: name.into(),
            format: Some(format.into()),
            delivery,
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.delivery.kind()
    }

    pub fn validate(&self) -> PublishResult<()> {
        require("destination name", &self.name)?;
        self.delivery.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_config_variant() {
        let dest = Destination::new(
            "wire",
            "ninjs",
            DestinationConfig::HttpPush(HttpPushConfig {
                resource_url: "https://partner.example/items".into(),
                assets_url: None,
            }),
        );
        assert_eq!(dest.kind(), TransportKind::HttpPush);
        assert_eq!(dest.kind().label(), "HTTP Push");
        assert!(dest.validate().is_ok());
    }

    #[test]
    fn test_legacy_kind_names_parse() {
        assert_eq!("ODBC".parse::<TransportKind>().unwrap(), TransportKind::Odbc);
        assert_eq!("File".parse::<TransportKind>().unwrap(), TransportKind::File);
        assert!("carrier_pigeon".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_schema_validation() {
        let ftp = DestinationConfig::Ftp(FtpConfig {
            host: " ".into(),
            port: 21,
            username: None,
            password: None,
            path: String::new(),
            passive: true,
        });
        assert!(matches!(ftp.validate(), Err(PublishError::Validation(_))));

        let email = DestinationConfig::Email(EmailConfig {
            recipients: vec!["desk@example.com".into(), "nobody".into()],
            sender: None,
        });
        assert!(matches!(email.validate(), Err(PublishError::Validation(msg)) if msg.contains("nobody")));

        assert!(DestinationConfig::Pull(PullConfig {}).validate().is_ok());
    }

    #[test]
    fn test_serialized_shape_is_tagged() {
        let dest = Destination::new(
            "drop",
            "text",
            DestinationConfig::File(FileConfig { path: "/srv/out".into() }),
        );
        let json = serde_json::to_value(&dest).unwrap();
        assert_eq!(json["delivery"]["delivery_type"], "file");
        assert_eq!(json["delivery"]["config"]["path"], "/srv/out");

        let back: Destination = serde_json::from_value(json).unwrap();
        assert_eq!(back, dest);
    }
}
