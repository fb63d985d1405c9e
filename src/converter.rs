//! The string <-> typed-value conversion contract (§4.9) plus the small
//! built-in set this crate ships. Application-specific converters beyond
//! these are an external collaborator (§1).

use std::fmt;
use std::time::Duration;

use crate::error::PropsError;

/// Converts a raw source value to `T` and back. `decode(None)` must succeed
/// with `Ok(None)` for any converter that allows a prop to be legitimately
/// absent; converters that require a value should return `Err` instead.
///
/// Round-trip law (§8): `decode(&encode(v)) == Ok(Some(v))` for every `v`
/// the converter declares representable.
pub trait Converter<T>: Send + Sync {
    fn decode(&self, raw: Option<&str>) -> Result<Option<T>, PropsError>;
    fn encode(&self, value: &T) -> String;
}

/// Passes the raw string through unchanged.
#[derive(Default, Clone, Copy)]
pub struct StringConverter;

impl Converter<String> for StringConverter {
    fn decode(&self, raw: Option<&str>) -> Result<Option<String>, PropsError> {
        Ok(raw.map(str::to_string))
    }

    fn encode(&self, value: &String) -> String {
        value.clone()
    }
}

/// Accepts `true`/`false` case-insensitively, plus `1`/`0`.
#[derive(Default, Clone, Copy)]
pub struct BoolConverter;

impl Converter<bool> for BoolConverter {
    fn decode(&self, raw: Option<&str>) -> Result<Option<bool>, PropsError> {
        let Some(raw) = raw else { return Ok(None) };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            other => Err(PropsError::conversion_failed(
                "",
                format!("'{other}' is not a valid bool"),
            )),
        }
    }

    fn encode(&self, value: &bool) -> String {
        value.to_string()
    }
}

/// Decimal `i64`.
#[derive(Default, Clone, Copy)]
pub struct IntConverter;

impl Converter<i64> for IntConverter {
    fn decode(&self, raw: Option<&str>) -> Result<Option<i64>, PropsError> {
        let Some(raw) = raw else { return Ok(None) };
        raw.trim().parse::<i64>().map(Some).map_err(|err| {
            PropsError::conversion_failed("", format!("'{raw}' is not a valid i64: {err}"))
        })
    }

    fn encode(&self, value: &i64) -> String {
        value.to_string()
    }
}

/// A trailing unit suffix `ms|s|m|h`, defaulting to seconds when absent.
#[derive(Default, Clone, Copy)]
pub struct DurationConverter;

impl Converter<Duration> for DurationConverter {
    fn decode(&self, raw: Option<&str>) -> Result<Option<Duration>, PropsError> {
        let Some(raw) = raw else { return Ok(None) };
        let trimmed = raw.trim();
        let (digits, unit_millis) = if let Some(d) = trimmed.strip_suffix("ms") {
            (d, 1u64)
        } else if let Some(d) = trimmed.strip_suffix('s') {
            (d, 1_000)
        } else if let Some(d) = trimmed.strip_suffix('m') {
            (d, 60_000)
        } else if let Some(d) = trimmed.strip_suffix('h') {
            (d, 3_600_000)
        } else {
            (trimmed, 1_000)
        };
        let magnitude: u64 = digits.trim().parse().map_err(|err| {
            PropsError::conversion_failed("", format!("'{raw}' is not a valid duration: {err}"))
        })?;
        Ok(Some(Duration::from_millis(magnitude * unit_millis)))
    }

    fn encode(&self, value: &Duration) -> String {
        format!("{}ms", value.as_millis())
    }
}

/// Wraps an inner converter, splitting/joining on a configurable separator
/// (default `,`).
pub struct ListConverter<C> {
    inner: C,
    separator: String,
}

impl<C> ListConverter<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            separator: ",".to_string(),
        }
    }

    pub fn with_separator(inner: C, separator: impl Into<String>) -> Self {
        Self {
            inner,
            separator: separator.into(),
        }
    }
}

impl<T, C> Converter<Vec<T>> for ListConverter<C>
where
    C: Converter<T>,
    T: fmt::Debug,
{
    fn decode(&self, raw: Option<&str>) -> Result<Option<Vec<T>>, PropsError> {
        let Some(raw) = raw else { return Ok(None) };
        if raw.is_empty() {
            return Ok(Some(Vec::new()));
        }
        let mut out = Vec::new();
        for part in raw.split(&self.separator) {
            match self.inner.decode(Some(part))? {
                Some(value) => out.push(value),
                None => {
                    return Err(PropsError::conversion_failed(
                        "",
                        format!("list element '{part}' decoded to no value"),
                    ));
                }
            }
        }
        Ok(Some(out))
    }

    fn encode(&self, value: &Vec<T>) -> String {
        value
            .iter()
            .map(|item| self.inner.encode(item))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_round_trips() {
        let c = BoolConverter;
        for v in [true, false] {
            let encoded = c.encode(&v);
            assert_eq!(c.decode(Some(&encoded)).unwrap(), Some(v));
        }
        assert_eq!(c.decode(Some("TRUE")).unwrap(), Some(true));
        assert_eq!(c.decode(Some("0")).unwrap(), Some(false));
        assert!(c.decode(Some("nope")).is_err());
    }

    #[test]
    fn int_round_trips() {
        let c = IntConverter;
        for v in [-42i64, 0, 1_000_000] {
            let encoded = c.encode(&v);
            assert_eq!(c.decode(Some(&encoded)).unwrap(), Some(v));
        }
    }

    #[test]
    fn duration_parses_unit_suffixes() {
        let c = DurationConverter;
        assert_eq!(c.decode(Some("500ms")).unwrap(), Some(Duration::from_millis(500)));
        assert_eq!(c.decode(Some("2s")).unwrap(), Some(Duration::from_secs(2)));
        assert_eq!(c.decode(Some("3m")).unwrap(), Some(Duration::from_secs(180)));
        assert_eq!(c.decode(Some("1h")).unwrap(), Some(Duration::from_secs(3600)));
        assert_eq!(c.decode(Some("5")).unwrap(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn list_converter_round_trips() {
        let c = ListConverter::new(IntConverter);
        let values = vec![1i64, 2, 3];
        let encoded = c.encode(&values);
        assert_eq!(encoded, "1,2,3");
        assert_eq!(c.decode(Some(&encoded)).unwrap(), Some(values));
    }

    #[test]
    fn absent_decodes_to_none() {
        assert_eq!(StringConverter.decode(None).unwrap(), None);
        assert_eq!(BoolConverter.decode(None).unwrap(), None);
    }
}
