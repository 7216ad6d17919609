//! Header map with case-insensitive lookup.

use std::borrow::Cow;
use std::fmt;

/// Ordered header list.
///
/// Names compare case-insensitively. Inserting a name that is already
/// present replaces its value in place, keeping the original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Wire form, one `name: value` line per header. CR and LF inside a
/// name or value are written as spaces so no entry can start a new line.
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{}: {}\r\n", single_line(name), single_line(value))?;
        }
        Ok(())
    }
}

fn single_line(text: &str) -> Cow<'_, str> {
    if text.contains(['\r', '\n']) {
        text.replace(['\r', '\n'], " ").into()
    } else {
        text.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_replace_keeps_position() {
        let mut headers = Headers::new();
        headers.insert("Host", "a");
        headers.insert("Accept", "*/*");
        headers.insert("host", "b");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("HOST"), Some("b"));
        assert_eq!(headers.to_string(), "Host: b\r\nAccept: */*\r\n");
    }

    #[test]
    fn test_line_breaks_never_reach_the_wire() {
        let headers: Headers = [("X-Note", "a\r\nSet-Cookie: evil=1"), ("X\rBad", "b\rc")]
            .into_iter()
            .collect();
        assert_eq!(headers.to_string(), "X-Note: a  Set-Cookie: evil=1\r\nX Bad: b c\r\n");
    }
}
