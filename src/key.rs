//! The stable name a prop or layer resolves by.

use std::borrow::Cow;
use std::fmt;

/// Separator used to join member keys into a `PropGroup`'s composite key.
pub const COMPOSITE_KEY_SEPARATOR: char = '\u{222A}';

/// A non-empty, printable name. Compared by exact byte equality.
///
/// `Cow<'static, str>` lets call sites register constant keys (`Key::from("app.port")`)
/// without an allocation while still allowing dynamically-built composite keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Cow<'static, str>);

impl Key {
    /// Builds a key, panicking if `name` is empty — callers are expected to
    /// pass literal or validated names, not user input.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "prop key must not be empty");
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins member keys with [`COMPOSITE_KEY_SEPARATOR`], in call order, to
    /// form the composite key a `PropGroup` is registered under.
    pub fn composite<'a>(members: impl IntoIterator<Item = &'a Key>) -> Self {
        let joined = members
            .into_iter()
            .map(Key::as_str)
            .collect::<Vec<_>>()
            .join(&COMPOSITE_KEY_SEPARATOR.to_string());
        Self::new(joined)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Key {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
