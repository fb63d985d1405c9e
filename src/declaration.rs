//! Parses a source-declaration file into the sources `RegistryBuilder` needs
//! (§4.10): one line per source, `TYPE` or `TYPE=OPTIONS`, lowest priority
//! first.

use std::sync::Arc;

use crate::error::PropsError;
use crate::source::Source;
use crate::sources::{ClasspathSource, EnvSource, FileSource, SystemPropertySource};

/// Turns declaration-file text into an ordered list of sources.
///
/// The built-in factory registry covers the standard types (`classpath`,
/// `env`, `file`, `system`); nothing here prevents a future `register`
/// method from growing custom types, but only the four standard ones are
/// called for here, so that extensibility is left for whoever needs it.
pub struct DeclarationParser;

impl DeclarationParser {
    /// Parses `text`, one declaration per line. Blank lines and lines
    /// starting with `#` are skipped. Fails on the first unknown type or
    /// malformed line, reporting its 1-based line number.
    pub fn parse(text: &str) -> Result<Vec<Arc<dyn Source>>, PropsError> {
        let mut sources = Vec::new();
        for (index, raw_line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (type_name, options) = match line.split_once('=') {
                Some((t, o)) => (t.trim(), Some(o.trim())),
                None => (line, None),
            };

            let source = build_source(line_number, type_name, options)?;
            sources.push(source);
        }
        Ok(sources)
    }
}

fn build_source(
    line_number: usize,
    type_name: &str,
    options: Option<&str>,
) -> Result<Arc<dyn Source>, PropsError> {
    match type_name.to_ascii_lowercase().as_str() {
        "env" => {
            require_no_options(line_number, "env", options)?;
            Ok(Arc::new(EnvSource::new()))
        }
        "system" => {
            require_no_options(line_number, "system", options)?;
            Ok(Arc::new(SystemPropertySource::new()))
        }
        "file" => {
            let path = require_options(line_number, "file", options)?;
            Ok(Arc::new(FileSource::new(path)))
        }
        "classpath" => {
            let resource = require_options(line_number, "classpath", options)?;
            let contents = std::fs::read_to_string(resource).map_err(|err| {
                PropsError::invalid_config(
                    line_number,
                    format!("failed to read classpath resource '{resource}': {err}"),
                )
            })?;
            Ok(Arc::new(ClasspathSource::new(resource, &contents)))
        }
        other => Err(PropsError::invalid_config(
            line_number,
            format!("unknown source type '{other}'"),
        )),
    }
}

fn require_no_options(line_number: usize, type_name: &str, options: Option<&str>) -> Result<(), PropsError> {
    if options.is_some() {
        return Err(PropsError::invalid_config(
            line_number,
            format!("source type '{type_name}' takes no options"),
        ));
    }
    Ok(())
}

fn require_options<'a>(
    line_number: usize,
    type_name: &str,
    options: Option<&'a str>,
) -> Result<&'a str, PropsError> {
    match options {
        Some(options) if !options.is_empty() => Ok(options),
        _ => Err(PropsError::invalid_config(
            line_number,
            format!("source type '{type_name}' requires an option"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_types_skipping_blanks_and_comments() {
        let text = "\
# a leading comment
env

system
file=/tmp/does-not-need-to-exist.properties
";
        let sources = DeclarationParser::parse(text).unwrap();
        let ids: Vec<&str> = sources.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["env", "system", "file:/tmp/does-not-need-to-exist.properties"]);
    }

    #[test]
    fn unknown_type_is_invalid_config() {
        let err = DeclarationParser::parse("nope\n").unwrap_err();
        assert!(matches!(err, PropsError::InvalidConfig { line: 1, .. }));
    }

    #[test]
    fn env_with_options_is_invalid_config() {
        let err = DeclarationParser::parse("env=whatever\n").unwrap_err();
        assert!(matches!(err, PropsError::InvalidConfig { line: 1, .. }));
    }

    #[test]
    fn file_without_options_is_invalid_config() {
        let err = DeclarationParser::parse("file\n").unwrap_err();
        assert!(matches!(err, PropsError::InvalidConfig { line: 1, .. }));
    }
}
