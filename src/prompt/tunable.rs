//! Per-prompt overrides that may defer to the global settings.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stored spelling of [`Tunable::Inherit`].
pub const INHERIT_SENTINEL: &str = "default";

/// A setting that either inherits the global value or overrides it.
///
/// Serialized as the literal `"default"` when inheriting. When reading, a
/// missing field, `null`, an empty string, `"default"`, or a value that does not
/// parse all mean [`Tunable::Inherit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Tunable<T> {
    #[default]
    Inherit,
    Explicit(T),
}

impl<T> Tunable<T> {
    pub fn explicit(&self) -> Option<&T> {
        match self {
            Self::Inherit => None,
            Self::Explicit(value) => Some(value),
        }
    }

    pub fn is_inherit(&self) -> bool {
        matches!(self, Self::Inherit)
    }
}

impl<T: Clone> Tunable<T> {
    /// The override, or `fallback` when inheriting.
    pub fn resolve(&self, fallback: T) -> T {
        self.explicit().cloned().unwrap_or(fallback)
    }
}

/// Values a [`Tunable`] can carry, with lenient parsing from stored JSON.
pub trait TunableValue: Sized {
    fn from_json(value: &Value) -> Option<Self>;
}

impl TunableValue for String {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
    }
}

impl TunableValue for u32 {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl<T: Serialize> Serialize for Tunable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Inherit => serializer.serialize_str(INHERIT_SENTINEL),
            Self::Explicit(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: TunableValue> Deserialize<'de> for Tunable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(Value::Null) => Self::Inherit,
            Some(Value::String(s)) if s.trim().is_empty() || s.trim() == INHERIT_SENTINEL => {
                Self::Inherit
            }
            Some(value) => match T::from_json(&value) {
                Some(parsed) => Self::Explicit(parsed),
                None => {
                    tracing::warn!(value = %value, "unusable prompt override, inheriting global setting");
                    Self::Inherit
                }
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize)]
    struct Holder {
        #[serde(default)]
        model: Tunable<String>,
        #[serde(default)]
        max_tokens: Tunable<u32>,
    }

    #[test]
    fn sentinel_and_absence_inherit() {
        let h: Holder = serde_json::from_value(json!({"model": "default"})).unwrap();
        assert!(h.model.is_inherit());
        assert!(h.max_tokens.is_inherit());

        let h: Holder = serde_json::from_value(json!({"model": "", "max_tokens": null})).unwrap();
        assert!(h.model.is_inherit());
        assert!(h.max_tokens.is_inherit());
    }

    #[test]
    fn explicit_values_parse_leniently() {
        let h: Holder =
            serde_json::from_value(json!({"model": "gpt-4o", "max_tokens": "800"})).unwrap();
        assert_eq!(h.model, Tunable::Explicit("gpt-4o".to_string()));
        assert_eq!(h.max_tokens, Tunable::Explicit(800));

        let h: Holder = serde_json::from_value(json!({"max_tokens": 1200})).unwrap();
        assert_eq!(h.max_tokens.resolve(500), 1200);
    }

    #[test]
    fn garbage_falls_back_to_inherit() {
        let h: Holder = serde_json::from_value(json!({"max_tokens": "lots"})).unwrap();
        assert_eq!(h.max_tokens.resolve(500), 500);
    }

    #[test]
    fn inherit_serializes_as_sentinel() {
        let h = Holder {
            model: Tunable::Inherit,
            max_tokens: Tunable::Explicit(64),
        };
        let value = serde_json::to_value(&h).unwrap();
        assert_eq!(value, json!({"model": "default", "max_tokens": 64}));
    }
}
