//! Limits applied while reading form bodies.
//!
//! Options can be built in code or loaded from the environment (optionally
//! seeded from a `.env` file):
//!
//! | Variable                  | Field           | Default  |
//! |---------------------------|-----------------|----------|
//! | `TONI_FORM_BUFFER_SIZE`   | `buffer_size`   | 8 KiB    |
//! | `TONI_FORM_MAX_BODY_SIZE` | `max_body_size` | 4 MiB    |
//! | `TONI_FORM_MAX_FIELDS`    | `max_fields`    | 1024     |
//! | `TONI_FORM_MAX_FILE_SIZE` | `max_file_size` | 10 MiB   |
//!
//! ```rust,no_run
//! use toni_http::config::FormOptions;
//!
//! # fn main() -> Result<(), toni_http::error::ConfigError> {
//! let options = FormOptions::from_env()?;
//! assert!(options.buffer_size > 0);
//! # Ok(())
//! # }
//! ```

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;
pub const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;
pub const DEFAULT_MAX_FIELDS: usize = 1024;
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

pub const BUFFER_SIZE_VAR: &str = "TONI_FORM_BUFFER_SIZE";
pub const MAX_BODY_SIZE_VAR: &str = "TONI_FORM_MAX_BODY_SIZE";
pub const MAX_FIELDS_VAR: &str = "TONI_FORM_MAX_FIELDS";
pub const MAX_FILE_SIZE_VAR: &str = "TONI_FORM_MAX_FILE_SIZE";

/// Trait for loading configuration from environment
pub trait FromEnv: Sized {
    fn load_from_env() -> Result<Self, ConfigError>;
}

/// Trait for configuration validation
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Limits for [`HttpRequest::get_form`](crate::HttpRequest::get_form).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOptions {
    /// Bytes requested per read from the body stream. Cancellation is
    /// observed at this granularity.
    pub buffer_size: usize,
    /// Cap on a urlencoded body, and on the total bytes of a multipart body.
    pub max_body_size: usize,
    /// Fields past this count are dropped.
    pub max_fields: usize,
    /// Cap on a single multipart file section.
    pub max_file_size: usize,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_fields: DEFAULT_MAX_FIELDS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl FormOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }

    #[must_use]
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    /// Load options from environment variables and validate them.
    pub fn from_env() -> Result<Self, ConfigError> {
        let options = Self::load_from_env()?;
        options.validate()?;
        Ok(options)
    }

    /// Load a `.env` file into the environment, then read the options.
    ///
    /// Variables already present in the process environment win over the file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        dotenv::from_path(path.into())?;
        Self::from_env()
    }
}

impl FromEnv for FormOptions {
    fn load_from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            buffer_size: env_or(BUFFER_SIZE_VAR, DEFAULT_BUFFER_SIZE)?,
            max_body_size: env_or(MAX_BODY_SIZE_VAR, DEFAULT_MAX_BODY_SIZE)?,
            max_fields: env_or(MAX_FIELDS_VAR, DEFAULT_MAX_FIELDS)?,
            max_file_size: env_or(MAX_FILE_SIZE_VAR, DEFAULT_MAX_FILE_SIZE)?,
        })
    }
}

impl Validate for FormOptions {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.max_body_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_body_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_vars() {
        for key in [
            BUFFER_SIZE_VAR,
            MAX_BODY_SIZE_VAR,
            MAX_FIELDS_VAR,
            MAX_FILE_SIZE_VAR,
        ] {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults_when_unset() {
        clear_vars();

        let options = FormOptions::from_env().unwrap();
        assert_eq!(options, FormOptions::default());
    }

    #[test]
    #[serial]
    fn test_reads_variables() {
        clear_vars();
        unsafe {
            env::set_var(BUFFER_SIZE_VAR, "1024");
            env::set_var(MAX_FIELDS_VAR, " 16 ");
        }

        let options = FormOptions::from_env().unwrap();
        assert_eq!(options.buffer_size, 1024);
        assert_eq!(options.max_fields, 16);
        assert_eq!(options.max_body_size, DEFAULT_MAX_BODY_SIZE);

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_parse_error_names_variable() {
        clear_vars();
        unsafe { env::set_var(MAX_BODY_SIZE_VAR, "lots") };

        let err = FormOptions::from_env().unwrap_err();
        match err {
            ConfigError::ParseError { key, .. } => assert_eq!(key, MAX_BODY_SIZE_VAR),
            other => panic!("unexpected error: {other}"),
        }

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_zero_buffer_fails_validation() {
        clear_vars();
        unsafe { env::set_var(BUFFER_SIZE_VAR, "0") };

        assert!(matches!(
            FormOptions::from_env(),
            Err(ConfigError::ValidationError(_))
        ));

        clear_vars();
    }

    #[test]
    #[serial]
    fn test_from_file() {
        clear_vars();
        let path = env::temp_dir().join(format!("toni-http-{}.env", std::process::id()));
        std::fs::write(&path, "TONI_FORM_MAX_FILE_SIZE=2048\n").unwrap();

        let options = FormOptions::from_file(&path).unwrap();
        assert_eq!(options.max_file_size, 2048);

        std::fs::remove_file(&path).unwrap();
        clear_vars();
    }

    #[test]
    fn test_builder_methods() {
        let options = FormOptions::new().buffer_size(16).max_fields(2);
        assert_eq!(options.buffer_size, 16);
        assert_eq!(options.max_fields, 2);
        assert!(options.validate().is_ok());
    }
}
