//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Serialization/deserialization library for converting between Rust structs and data formats
//! - **derive macros**: Automatically generate code for common traits (Debug, Clone, Serialize, Deserialize)
//! - **Result<T, E>**: Error handling that forces you to handle potential failures
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER__HOST, APP_SERVER__PORT, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! Everything here is read once at startup. The filler matcher list and the
//! loaded Whisper model are fixed for the lifetime of the process, so unlike
//! a typical backend there is deliberately no runtime-update path.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, model, upload)
/// makes it easier to understand and maintain as the application grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub upload: UploadConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
/// - `port = 8000`: The port the original deployment listened on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16, // u16 = unsigned 16-bit integer (0-65535), perfect for port numbers
}

/// Speech-to-text model configuration.
///
/// ## Fields:
/// - `whisper_model`: Which Whisper model to load at startup ("tiny", "base", "small", "medium", "large")
/// - `language`: Language hint passed to the model (ISO 639-1 code like "en")
/// - `device`: Inference device preference ("auto", "cpu", "cuda", "metal")
///
/// ## Model size trade-offs:
/// - Smaller models: Faster startup and transcription, lower accuracy
/// - Larger models: Slower, more memory, higher accuracy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub whisper_model: String,
    pub language: String,
    pub device: String,
}

/// Upload handling configuration.
///
/// ## Fields:
/// - `max_file_size_mb`: Largest audio upload accepted by `/analyze`, in megabytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_file_size_mb: usize,
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// Default values ensure the application can start even if no configuration file exists.
/// They also serve as documentation of reasonable starting values.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(), // The service fronts a web form, accept from anywhere
                port: 8000,
            },
            model: ModelConfig {
                whisper_model: "base".to_string(), // Good balance of load time and accuracy
                language: "en".to_string(),
                device: "auto".to_string(),
            },
            upload: UploadConfig {
                max_file_size_mb: 50, // Generous for a few minutes of WAV audio
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST and PORT environment variables
    ///
    /// ## Environment Variable Examples:
    /// Sections and field names are joined with a double underscore, so that
    /// snake_case field names keep their single underscores intact:
    /// - `APP_SERVER__PORT=3000`: Override server port
    /// - `APP_MODEL__WHISPER_MODEL=small`: Override whisper model
    /// - `APP_UPLOAD__MAX_FILE_SIZE_MB=10`: Override the upload cap
    /// - `HOST=0.0.0.0` / `PORT=3000`: Special cases for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            // 1. Start with defaults - converts our Default impl to config format
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // 2. Load from config.toml file (if it exists)
            .add_source(config::File::with_name("config").required(false))
            // 3. Load from environment variables with APP_ prefix.
            // The "__" section separator leaves snake_case leaves like
            // whisper_model addressable; a single "_" would split them
            // into nonexistent nested keys that serde silently drops.
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        // Deployment platforms commonly inject plain HOST/PORT variables
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0 (port 0 is reserved and can't be bound)
    /// - The whisper model name parses to a known size
    /// - The upload cap is non-zero
    ///
    /// ## Why validate:
    /// Catching configuration errors early prevents runtime failures and
    /// provides clear error messages about what's wrong.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        self.model
            .whisper_model
            .parse::<crate::transcription::ModelSize>()?;

        if self.upload.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        Ok(())
    }

    /// Upload size cap in bytes, derived from the configured megabytes.
    pub fn max_upload_bytes(&self) -> usize {
        self.upload.max_file_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that the default configuration is valid and has expected values.
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.whisper_model, "base");
        assert_eq!(config.model.language, "en");
        // Ensure the default config passes validation
        assert!(config.validate().is_ok());
    }

    /// Test that validation catches invalid configurations.
    #[test]
    fn test_config_validation_rejects_port_zero() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_unknown_model() {
        let mut config = AppConfig::default();
        config.model.whisper_model = "enormous".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_zero_upload_cap() {
        let mut config = AppConfig::default();
        config.upload.max_file_size_mb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_upload_bytes() {
        let config = AppConfig::default();
        assert_eq!(config.max_upload_bytes(), 50 * 1024 * 1024);
    }

    /// Snake_case leaves must be reachable through APP_* overrides; the
    /// double-underscore separator keeps `whisper_model` from being split
    /// into nested keys that deserialize to nothing.
    #[test]
    fn test_env_overrides_snake_case_fields() {
        std::env::set_var("APP_MODEL__WHISPER_MODEL", "small");
        std::env::set_var("APP_UPLOAD__MAX_FILE_SIZE_MB", "10");

        let config = AppConfig::load().unwrap();

        std::env::remove_var("APP_MODEL__WHISPER_MODEL");
        std::env::remove_var("APP_UPLOAD__MAX_FILE_SIZE_MB");

        assert_eq!(config.model.whisper_model, "small");
        assert_eq!(config.upload.max_file_size_mb, 10);
        // Untouched fields keep their defaults
        assert_eq!(config.model.language, "en");
    }
}
