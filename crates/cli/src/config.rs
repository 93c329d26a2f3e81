//! Command-line tool configuration

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use usbcan::Selection;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsbcanConfig {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub device: DeviceSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Device to open when none is given on the command line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Firmware ID to look for (exact, case-sensitive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// System path to open directly; takes precedence over `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl DeviceSettings {
    /// Selection from these settings, with command-line values overriding
    pub fn selection(&self, name: Option<String>, path: Option<String>) -> Selection {
        if name.is_some() || path.is_some() {
            return Selection::from_parts(name, path);
        }
        Selection::from_parts(self.name.clone(), self.path.clone())
    }
}

impl UsbcanConfig {
    /// Load configuration from `path`, or from the default location
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => {
                let default = Self::default_path();
                if !default.exists() {
                    return Err(anyhow!("No configuration file found, using defaults"));
                }
                default
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: UsbcanConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        tracing::debug!(
            "Config: device name={:?}, path={:?}",
            config.device.name,
            config.device.path
        );
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                // Logging is not up yet
                eprintln!("Config: {}", e);
                Self::default()
            }
        }
    }

    /// Load from a user-supplied path, expanding a leading `~`
    pub fn load_from(path: &str) -> Result<Self> {
        let path_buf = PathBuf::from(shellexpand::tilde(path).as_ref());
        Self::load(Some(path_buf))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usbcan").join("usbcan.toml")
        } else {
            PathBuf::from(".config/usbcan/usbcan.toml")
        }
    }

    fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        if self.device.name.as_deref() == Some("") {
            return Err(anyhow!("Empty device name in [device] section"));
        }
        match self.device.path.as_deref() {
            Some("") => return Err(anyhow!("Empty device path in [device] section")),
            Some(p) if p.contains('\0') => {
                return Err(anyhow!("Device path contains a NUL character"));
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = UsbcanConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.device.name.is_none());
        assert!(config.device.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = UsbcanConfig::default();
        config.device.name = Some("Bench".to_string());
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: UsbcanConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.logging.level, "info");
        assert_eq!(parsed.device.name.as_deref(), Some("Bench"));
        assert!(parsed.device.path.is_none());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let parsed: UsbcanConfig = toml::from_str("[device]\nname = \"Car\"\n").unwrap();
        assert_eq!(parsed.logging.level, "info");
        assert_eq!(parsed.device.name.as_deref(), Some("Car"));
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = UsbcanConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "trace".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_device_fields() {
        let mut config = UsbcanConfig::default();
        config.device.name = Some(String::new());
        assert!(config.validate().is_err());

        config.device.name = None;
        config.device.path = Some("a\0b".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("usbcan.toml");

        let mut config = UsbcanConfig::default();
        config.logging.level = "debug".to_string();
        config.device.path = Some(r"\\?\usb#vid_16d0".to_string());
        config.save(&path).unwrap();

        let loaded = UsbcanConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.logging.level, "debug");
        assert_eq!(loaded.device.path.as_deref(), Some(r"\\?\usb#vid_16d0"));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usbcan.toml");
        fs::write(&path, "[logging]\nlevel = \"chatty\"\n").unwrap();
        assert!(UsbcanConfig::load(Some(path)).is_err());
    }

    #[test]
    fn test_selection_prefers_command_line() {
        let settings = DeviceSettings {
            name: Some("Bench".to_string()),
            path: None,
        };
        assert_eq!(
            settings.selection(Some("Car".to_string()), None),
            Selection::Name("Car".to_string())
        );
        assert_eq!(
            settings.selection(None, None),
            Selection::Name("Bench".to_string())
        );
        assert_eq!(DeviceSettings::default().selection(None, None), Selection::Any);
    }
}
