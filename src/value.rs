//! The raw, untyped value a source produces for a key.

/// A raw source value. `None` is `absent` (no mapping); `Some(String::new())`
/// is the empty string — the two are kept distinct per the data model, which
/// is exactly what `Option<String>` gives us for free.
pub type RawValue = Option<String>;
