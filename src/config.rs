//! Boot Configuration
//!
//! Parses the kernel command line handed over by the boot loader.
//!
//! # Format
//! Whitespace-separated `key=value` tokens. Recognized keys:
//! - `loglevel=off|error|warn|info|debug|trace`
//! - `pledge=stdio,proc,...` promises granted to root processes
//!
//! Unknown keys and bare flags are skipped so loaders can pass options
//! meant for other components.

use core::fmt;

use log::LevelFilter;

use crate::cap::PledgeMask;

/// Runtime configuration of the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Maximum level the logger emits.
    pub log_level: LevelFilter,
    /// Promises granted to processes spawned without a parent.
    pub initial_promises: PledgeMask,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Info,
            initial_promises: PledgeMask::all(),
        }
    }
}

/// A recognized key carried a value that could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel,
    UnknownPromise,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidLogLevel => write!(f, "invalid loglevel"),
            ConfigError::UnknownPromise => write!(f, "unknown promise in pledge="),
        }
    }
}

impl KernelConfig {
    /// Parse a command line, starting from the defaults.
    pub fn from_cmdline(cmdline: &[u8]) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for token in cmdline
            .split(|b| b.is_ascii_whitespace())
            .filter(|t| !t.is_empty())
        {
            let Some(eq) = token.iter().position(|&b| b == b'=') else {
                continue;
            };
            let (key, value) = (&token[..eq], &token[eq + 1..]);
            match key {
                b"loglevel" => config.log_level = parse_level(value)?,
                b"pledge" => {
                    config.initial_promises = PledgeMask::parse_with(value, |&b| b == b',')
                        .map_err(|_| ConfigError::UnknownPromise)?;
                }
                _ => {}
            }
        }
        Ok(config)
    }
}

fn parse_level(value: &[u8]) -> Result<LevelFilter, ConfigError> {
    core::str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(ConfigError::InvalidLogLevel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cmdline_is_default() {
        assert_eq!(KernelConfig::from_cmdline(b""), Ok(KernelConfig::default()));
        assert_eq!(KernelConfig::from_cmdline(b"   \n"), Ok(KernelConfig::default()));
    }

    #[test]
    fn test_recognized_keys() {
        let config =
            KernelConfig::from_cmdline(b"console=ttyAMA0 loglevel=debug quiet pledge=stdio,proc")
                .unwrap();
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.initial_promises, PledgeMask::STDIO | PledgeMask::PROC);
    }

    #[test]
    fn test_empty_pledge_grants_nothing() {
        let config = KernelConfig::from_cmdline(b"pledge=").unwrap();
        assert!(config.initial_promises.is_empty());
    }

    #[test]
    fn test_bad_values() {
        assert_eq!(
            KernelConfig::from_cmdline(b"loglevel=loud"),
            Err(ConfigError::InvalidLogLevel)
        );
        assert_eq!(
            KernelConfig::from_cmdline(b"pledge=stdio,root"),
            Err(ConfigError::UnknownPromise)
        );
    }
}
