//! Compiler options, read from string keyed flags so that every front end
//! (command line, test harness, build tool) goes through the same parsing.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for option `{key}`: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterBudget {
    /// Minimize registers without enforcing an upper bound
    Unbounded,
    /// Fail when a method needs more than this many registers for its locals
    AtMost(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompilerConfig {
    /// Run the AST optimizer to a fixed point before lowering
    pub optimize: bool,
    /// `None` keeps the natural slot assignment of the IR generator
    pub register_allocation: Option<RegisterBudget>,
    /// Log intermediate representations
    pub debug: bool,
}

impl CompilerConfig {
    pub const OPTIMIZE: &'static str = "optimize";
    pub const REGISTER_ALLOCATION: &'static str = "registerAllocation";
    pub const DEBUG: &'static str = "debug";

    pub fn from_flags<'a>(
        flags: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (key, value) in flags {
            match key {
                Self::OPTIMIZE => config.optimize = is_enabled(value),
                Self::DEBUG => config.debug = is_enabled(value),
                Self::REGISTER_ALLOCATION => {
                    let registers =
                        value
                            .trim()
                            .parse::<i64>()
                            .map_err(|error| ConfigError::InvalidValue {
                                key: key.to_string(),
                                value: value.to_string(),
                                reason: error.to_string(),
                            })?;

                    config.register_allocation = match registers {
                        i64::MIN..=-1 => None,
                        0 => Some(RegisterBudget::Unbounded),
                        n => Some(RegisterBudget::AtMost(n as usize)),
                    };
                }
                _ => tracing::debug!(key, value, "ignoring unknown compiler option"),
            }
        }

        Ok(config)
    }
}

/// Only `true` switches a stage on
fn is_enabled(value: &str) -> bool {
    value.trim() == "true"
}
