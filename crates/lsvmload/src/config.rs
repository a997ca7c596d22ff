//! `lsvmconf` parsing (spec.md §6): a hand-rolled line-oriented
//! `KEY=VALUE` parser, matching the teacher's preference for a small
//! bespoke parser over pulling in a TOML/YAML crate for a format this
//! small. Grounded on `original_source/lsvmutils/conf.c` and
//! `lsvmload/loadconf.c`'s semantics (`#` comments, whitespace-tolerant
//! `KEY=VALUE`, required-key validation).

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Fatal,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Fatal => log::LevelFilter::Error,
            Self::Error => log::LevelFilter::Error,
            Self::Warning => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FATAL" => Ok(Self::Fatal),
            "ERROR" => Ok(Self::Error),
            "WARNING" => Ok(Self::Warning),
            "INFO" => Ok(Self::Info),
            "DEBUG" => Ok(Self::Debug),
            other => Err(ConfigError::BadLogLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration key: {0}")]
    MissingKey(&'static str),
    #[error("unknown configuration key")]
    UnknownKey,
    #[error("bad log level")]
    BadLogLevel(String),
    #[error("expected a UUID string")]
    BadGuid,
}

/// Parsed `lsvmconf` contents. `boot_device`/`root_device` are kept only
/// because downstream collaborators consume them (spec.md §6); this
/// orchestrator never reads them itself.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: LogLevel,
    pub efi_vendor_dir: String,
    pub boot_device_luks: String,
    pub root_device_luks: String,
    pub boot_device: Option<String>,
    pub root_device: Option<String>,
}

fn looks_like_guid(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 36
        && bytes
            .iter()
            .enumerate()
            .all(|(i, &b)| match i {
                8 | 13 | 18 | 23 => b == b'-',
                _ => b.is_ascii_hexdigit(),
            })
}

impl Config {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut log_level = LogLevel::Info;
        let mut efi_vendor_dir = None;
        let mut boot_device_luks = None;
        let mut root_device_luks = None;
        let mut boot_device = None;
        let mut root_device = None;

        for raw_line in text.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or(ConfigError::UnknownKey)?;
            let key = key.trim();
            let value = value.trim();

            match key {
                "LogLevel" => log_level = value.parse()?,
                "EFIVendorDir" => efi_vendor_dir = Some(value.to_string()),
                "BootDeviceLUKS" => {
                    if !looks_like_guid(value) {
                        return Err(ConfigError::BadGuid);
                    }
                    boot_device_luks = Some(value.to_string());
                }
                "RootDeviceLUKS" => {
                    if !looks_like_guid(value) {
                        return Err(ConfigError::BadGuid);
                    }
                    root_device_luks = Some(value.to_string());
                }
                "BootDevice" => boot_device = Some(value.to_string()),
                "RootDevice" => root_device = Some(value.to_string()),
                _ => return Err(ConfigError::UnknownKey),
            }
        }

        Ok(Self {
            log_level,
            efi_vendor_dir: efi_vendor_dir.ok_or(ConfigError::MissingKey("EFIVendorDir"))?,
            boot_device_luks: boot_device_luks.ok_or(ConfigError::MissingKey("BootDeviceLUKS"))?,
            root_device_luks: root_device_luks.ok_or(ConfigError::MissingKey("RootDeviceLUKS"))?,
            boot_device,
            root_device,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "\
EFIVendorDir=Contoso
BootDeviceLUKS=11111111-1111-1111-1111-111111111111
RootDeviceLUKS=22222222-2222-2222-2222-222222222222
";

    #[test]
    fn parses_minimal_config() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.efi_vendor_dir, "Contoso");
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn tolerates_comments_and_whitespace() {
        let text = "  # a comment\nLogLevel = DEBUG  # trailing\n".to_string() + MINIMAL;
        let config = Config::parse(&text).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn missing_required_key_is_fatal() {
        let text = "LogLevel=INFO\n";
        assert_eq!(Config::parse(text), Err(ConfigError::MissingKey("EFIVendorDir")));
    }

    #[test]
    fn rejects_unknown_key() {
        let text = MINIMAL.to_string() + "Bogus=1\n";
        assert_eq!(Config::parse(&text), Err(ConfigError::UnknownKey));
    }

    #[test]
    fn rejects_non_guid_device_value() {
        let text = "EFIVendorDir=X\nBootDeviceLUKS=not-a-guid\nRootDeviceLUKS=22222222-2222-2222-2222-222222222222\n";
        assert_eq!(Config::parse(text), Err(ConfigError::BadGuid));
    }

    #[test]
    fn rejects_bad_log_level() {
        let text = "LogLevel=VERBOSE\n".to_string() + MINIMAL;
        assert!(matches!(Config::parse(&text), Err(ConfigError::BadLogLevel(_))));
    }
}
