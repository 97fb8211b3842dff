//! Named, typed, validated parameters shared with the operator console.
//!
//! The store is owned by the embedding tool; server units register their
//! parameters with defaults at construction time and resolve them on every
//! configure. `set` is the validation point: a rejected value leaves the
//! previous one in place.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::RwLock;

/// Plain-function validator run on every `set`.
pub type Validator = fn(&str) -> bool;

/// Declaration of a single parameter: name, default, console description and
/// an optional validator.
pub struct ParamSpec {
    name: &'static str,
    default: String,
    description: &'static str,
    validator: Option<Validator>,
}

impl ParamSpec {
    pub fn new(name: &'static str, default: impl Into<String>, description: &'static str) -> Self {
        Self {
            name,
            default: default.into(),
            description,
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }
}

struct Entry {
    spec: ParamSpec,
    value: Option<String>,
}

/// Thread-safe store of named parameters.
#[derive(Default)]
pub struct ParamStore {
    entries: RwLock<HashMap<&'static str, Entry>>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter. Re-defining a name replaces the spec and clears
    /// any previously set value.
    pub fn define(&self, spec: ParamSpec) {
        let mut entries = self.entries.write().expect("parameter store poisoned");
        entries.insert(spec.name, Entry { spec, value: None });
    }

    /// Set a parameter, running its validator. The previous value is kept on
    /// rejection.
    pub fn set(&self, name: &str, value: impl Into<String>) -> Result<(), ParamError> {
        let value = value.into();
        let mut entries = self.entries.write().expect("parameter store poisoned");
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| ParamError::Unknown(name.to_string()))?;
        if let Some(validator) = entry.spec.validator {
            if !validator(&value) {
                return Err(ParamError::Rejected {
                    name: name.to_string(),
                    value,
                });
            }
        }
        entry.value = Some(value);
        Ok(())
    }

    /// Current value of a parameter, falling back to its default.
    pub fn string(&self, name: &str) -> Result<String, ParamError> {
        let entries = self.entries.read().expect("parameter store poisoned");
        let entry = entries
            .get(name)
            .ok_or_else(|| ParamError::Unknown(name.to_string()))?;
        Ok(entry
            .value
            .clone()
            .unwrap_or_else(|| entry.spec.default.clone()))
    }

    /// Typed read of a parameter via `FromStr`.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T, ParamError> {
        let raw = self.string(name)?;
        raw.parse().map_err(|_| ParamError::Parse {
            name: name.to_string(),
            value: raw,
        })
    }

    /// Sorted `(name, value, description)` listing for the operator console.
    pub fn snapshot(&self) -> Vec<(String, String, String)> {
        let entries = self.entries.read().expect("parameter store poisoned");
        let mut rows: Vec<_> = entries
            .values()
            .map(|entry| {
                (
                    entry.spec.name.to_string(),
                    entry
                        .value
                        .clone()
                        .unwrap_or_else(|| entry.spec.default.clone()),
                    entry.spec.description.to_string(),
                )
            })
            .collect();
        rows.sort();
        rows
    }
}

/// Validators for common parameter shapes.
pub mod validators {
    use std::net::Ipv4Addr;

    /// Accepts dotted-quad IPv4 addresses.
    pub fn ipv4(value: &str) -> bool {
        value.parse::<Ipv4Addr>().is_ok()
    }

    /// Accepts ports in 1..=65535.
    pub fn port(value: &str) -> bool {
        matches!(value.parse::<u32>(), Ok(1..=65535))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParamError {
    #[error("unknown parameter '{0}'")]
    Unknown(String),

    #[error("invalid value '{value}' for parameter '{name}'")]
    Rejected { name: String, value: String },

    #[error("cannot parse value '{value}' of parameter '{name}'")]
    Parse { name: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(spec: ParamSpec) -> ParamStore {
        let store = ParamStore::new();
        store.define(spec);
        store
    }

    #[test]
    fn unset_parameter_falls_back_to_default() {
        let store = store_with(ParamSpec::new("greeting", "hello", "A greeting."));
        assert_eq!(store.string("greeting").unwrap(), "hello");
    }

    #[test]
    fn set_overrides_default() {
        let store = store_with(ParamSpec::new("greeting", "hello", "A greeting."));
        store.set("greeting", "hi").unwrap();
        assert_eq!(store.string("greeting").unwrap(), "hi");
    }

    #[test]
    fn unknown_parameter_is_an_error() {
        let store = ParamStore::new();
        assert!(matches!(
            store.string("missing"),
            Err(ParamError::Unknown(_))
        ));
        assert!(matches!(
            store.set("missing", "x"),
            Err(ParamError::Unknown(_))
        ));
    }

    #[test]
    fn rejected_value_keeps_the_previous_one() {
        let store = store_with(
            ParamSpec::new("addr", "127.0.0.1", "An address.").with_validator(validators::ipv4),
        );
        store.set("addr", "10.0.0.1").unwrap();
        assert!(matches!(
            store.set("addr", "not-an-ip"),
            Err(ParamError::Rejected { .. })
        ));
        assert_eq!(store.string("addr").unwrap(), "10.0.0.1");
    }

    #[test]
    fn typed_parse_succeeds_and_fails() {
        let store = store_with(ParamSpec::new("port", "80", "A port."));
        assert_eq!(store.parse::<u16>("port").unwrap(), 80);
        store.set("port", "junk").unwrap();
        assert!(matches!(
            store.parse::<u16>("port"),
            Err(ParamError::Parse { .. })
        ));
    }

    #[test]
    fn port_validator_bounds() {
        assert!(validators::port("1"));
        assert!(validators::port("65535"));
        assert!(!validators::port("0"));
        assert!(!validators::port("65536"));
        assert!(!validators::port("http"));
    }

    #[test]
    fn ipv4_validator_rejects_hostnames() {
        assert!(validators::ipv4("0.0.0.0"));
        assert!(!validators::ipv4("example.com"));
        assert!(!validators::ipv4("::1"));
    }

    #[test]
    fn snapshot_is_sorted_by_name() {
        let store = ParamStore::new();
        store.define(ParamSpec::new("b.second", "2", "Second."));
        store.define(ParamSpec::new("a.first", "1", "First."));
        let rows = store.snapshot();
        assert_eq!(rows[0].0, "a.first");
        assert_eq!(rows[1].0, "b.second");
    }
}
