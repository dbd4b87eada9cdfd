//! Environment variable access behind a seam.
//!
//! [`Env::real()`] reads the process environment; [`Env::mock()`]
//! serves a fixed map so tests never touch global state through
//! `std::env::set_var`.

use std::collections::HashMap;

/// Environment variable reader.
#[derive(Clone, Debug)]
pub enum Env {
    /// Delegates to [`std::env::var`].
    Real,
    /// Serves values from a fixed map.
    Mock(HashMap<String, String>),
}

impl Env {
    /// An `Env` backed by the real process environment.
    pub fn real() -> Self {
        Env::Real
    }

    /// An `Env` backed by explicit key-value pairs.
    pub fn mock(vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Env::Mock(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Look up a variable by name.
    pub fn var(&self, name: &str) -> Result<String, std::env::VarError> {
        match self {
            Env::Real => std::env::var(name),
            Env::Mock(map) => map.get(name).cloned().ok_or(std::env::VarError::NotPresent),
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::real()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_env_reads_cargo_manifest_dir() {
        let env = Env::real();
        assert!(env.var("CARGO_MANIFEST_DIR").is_ok());
    }

    #[test]
    fn mock_env_returns_set_values() {
        let env = Env::mock([("FOO", "bar"), ("BAZ", "qux")]);
        assert_eq!(env.var("FOO").unwrap(), "bar");
        assert_eq!(env.var("BAZ").unwrap(), "qux");
    }

    #[test]
    fn mock_env_returns_not_present_for_missing() {
        let env = Env::mock(Vec::<(&str, &str)>::new());
        assert!(env.var("NONEXISTENT").is_err());
    }
}
