//! Engine configuration.
//!
//! Resolved once at startup, from defaults, builders or the environment:
//!
//! | variable | meaning |
//! |---|---|
//! | `XDSQ_MAX_CLOSURE_ROUNDS` | closure rounds that may accept new ids, at least 1 |
//! | `XDSQ_MAX_RESULTS` | result size limit; unset means unlimited |
//! | `XDSQ_RETURN_TYPE` | `LeafClass` or `ObjectRef` |

use crate::closure::DEFAULT_MAX_CLOSURE_ROUNDS;
use crate::response::ReturnType;

pub const ENV_MAX_CLOSURE_ROUNDS: &str = "XDSQ_MAX_CLOSURE_ROUNDS";
pub const ENV_MAX_RESULTS: &str = "XDSQ_MAX_RESULTS";
pub const ENV_RETURN_TYPE: &str = "XDSQ_RETURN_TYPE";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    max_closure_rounds: usize,
    max_results: Option<usize>,
    return_type: ReturnType,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_closure_rounds: DEFAULT_MAX_CLOSURE_ROUNDS,
            max_results: None,
            return_type: ReturnType::LeafClass,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails on zero. The bound counts rounds that accept new ids.
    pub fn with_max_closure_rounds(mut self, rounds: usize) -> Result<Self, ConfigError> {
        if rounds == 0 {
            return Err(ConfigError::InvalidValue {
                name: ENV_MAX_CLOSURE_ROUNDS,
                value: rounds.to_string(),
            });
        }
        self.max_closure_rounds = rounds;
        Ok(self)
    }

    pub fn with_max_results(mut self, limit: Option<usize>) -> Self {
        self.max_results = limit;
        self
    }

    pub fn with_return_type(mut self, return_type: ReturnType) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn max_closure_rounds(&self) -> usize {
        self.max_closure_rounds
    }

    pub fn max_results(&self) -> Option<usize> {
        self.max_results
    }

    pub fn return_type(&self) -> ReturnType {
        self.return_type
    }

    /// Read the `XDSQ_*` variables; unset ones keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let read = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(value) = read(ENV_MAX_CLOSURE_ROUNDS) {
            config = config.with_max_closure_rounds(parse_count(ENV_MAX_CLOSURE_ROUNDS, &value)?)?;
        }
        if let Some(value) = read(ENV_MAX_RESULTS) {
            config = config.with_max_results(Some(parse_count(ENV_MAX_RESULTS, &value)?));
        }
        if let Some(value) = read(ENV_RETURN_TYPE) {
            let return_type: ReturnType = value.parse().map_err(|_| ConfigError::InvalidValue {
                name: ENV_RETURN_TYPE,
                value: value.clone(),
            })?;
            config = config.with_return_type(return_type);
        }
        Ok(config)
    }
}

fn parse_count(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        })
}
