//! Java-properties-style text parsing (§4.11), shared by `ClasspathSource`
//! and `FileSource`.
//!
//! Supported: `key=value`, `key:value`, and whitespace-separated
//! `key value`; `#` and `!` line comments; trailing-backslash line
//! continuation; `\n`, `\t`, `\\`, `\uXXXX` escapes inside values.

use crate::source::Snapshot;

pub fn parse(contents: &str) -> Snapshot {
    let mut result = Snapshot::new();
    let mut logical_lines = join_continuations(contents);

    for line in logical_lines.drain(..) {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        if let Some((key, value)) = split_key_value(trimmed) {
            let key = unescape(&key);
            if key.is_empty() {
                // A bare `=value` or `:value` line, or a line that is
                // nothing but a separator, names no key; Key::new requires
                // a non-empty name, so the parser must drop it here rather
                // than hand a registry an empty-key mapping it will panic
                // on.
                continue;
            }
            result.insert(key, unescape(&value));
        }
    }

    result
}

/// Joins lines ending in an odd number of trailing backslashes with the
/// line that follows, stripping the continuation backslash itself.
fn join_continuations(contents: &str) -> Vec<String> {
    let mut logical = Vec::new();
    let mut pending = String::new();
    let mut in_continuation = false;

    for raw_line in contents.lines() {
        let line = if in_continuation {
            pending.push_str(raw_line.trim_start());
            &pending
        } else {
            raw_line
        };

        if ends_with_odd_backslashes(line) {
            if !in_continuation {
                pending = line.to_string();
            }
            pending.truncate(pending.len() - 1);
            in_continuation = true;
            continue;
        }

        if in_continuation {
            logical.push(std::mem::take(&mut pending));
            in_continuation = false;
        } else {
            logical.push(line.to_string());
        }
    }
    if in_continuation {
        logical.push(pending);
    }
    logical
}

fn ends_with_odd_backslashes(line: &str) -> bool {
    let count = line.chars().rev().take_while(|&c| c == '\\').count();
    count % 2 == 1
}

/// Splits on the first unescaped `=`, `:`, or run of whitespace, whichever
/// comes first, matching `java.util.Properties`' key/value separator rules.
fn split_key_value(line: &str) -> Option<(String, String)> {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    let mut escaped = false;
    while i < chars.len() {
        let c = chars[i];
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || c.is_whitespace() {
            let key: String = chars[..i].iter().collect();
            let mut j = i;
            if c.is_whitespace() {
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && (chars[j] == '=' || chars[j] == ':') {
                    j += 1;
                }
            } else {
                j += 1;
            }
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            let value: String = chars[j..].iter().collect();
            return Some((key, value));
        }
        i += 1;
    }
    if chars.is_empty() {
        None
    } else {
        let key: String = chars.iter().collect();
        Some((key, String::new()))
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('u') => {
                let hex: String = (0..4).filter_map(|_| chars.next()).collect();
                if let Ok(code) = u32::from_str_radix(&hex, 16) {
                    if let Some(ch) = char::from_u32(code) {
                        out.push(ch);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
