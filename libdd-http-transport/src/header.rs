// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Request header fields and their wire rendering.

use std::fmt;

/// A single `name: value` header field.
///
/// Neither the name nor the value is validated against the HTTP token
/// grammar; callers are trusted to provide well-formed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: String,
    value: String,
}

impl HeaderField {
    /// Create a header field.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The field name, as given.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field value, as given.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for HeaderField {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}

/// An ordered collection of header fields.
///
/// Insertion order is kept all the way to the wire, and duplicate names are
/// allowed: each field is rendered on its own line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFieldSet {
    fields: Vec<HeaderField>,
}

impl HeaderFieldSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field after all existing ones.
    pub fn push(&mut self, field: impl Into<HeaderField>) {
        self.fields.push(field.into());
    }

    /// Append a field, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(HeaderField::new(name, value));
        self
    }

    /// Iterate over the fields in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, HeaderField> {
        self.fields.iter()
    }

    /// Number of fields, duplicates included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the set holds no field.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns true if at least one field has this name (ASCII case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Render the set as header lines, each terminated by CRLF.
    ///
    /// The output can be concatenated directly with the blank line separating
    /// the header block from the body. An empty set renders as an empty string.
    pub fn render(&self) -> String {
        let capacity = self
            .fields
            .iter()
            .map(|f| f.name.len() + f.value.len() + 4)
            .sum();
        let mut out = String::with_capacity(capacity);
        for field in &self.fields {
            out.push_str(&field.name);
            out.push_str(": ");
            out.push_str(&field.value);
            out.push_str("\r\n");
        }
        out
    }
}

impl<F: Into<HeaderField>> FromIterator<F> for HeaderFieldSet {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a HeaderFieldSet {
    type Item = &'a HeaderField;
    type IntoIter = std::slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_display() {
        let field = HeaderField::new("Content-Type", "application/json");
        assert_eq!(field.to_string(), "Content-Type: application/json");
    }

    #[test]
    fn empty_set_renders_nothing() {
        assert_eq!(HeaderFieldSet::new().render(), "");
    }

    #[test]
    fn render_one_line_per_field_in_order() {
        let set = HeaderFieldSet::new()
            .with("Content-Type", "application/json")
            .with("Accept", "*/*")
            .with("X-Trace", "1");

        let rendered = set.render();
        assert_eq!(
            rendered,
            "Content-Type: application/json\r\nAccept: */*\r\nX-Trace: 1\r\n"
        );
        assert_eq!(rendered.matches("\r\n").count(), set.len());

        let names: Vec<&str> = rendered
            .split_terminator("\r\n")
            .map(|line| line.split(": ").next().unwrap())
            .collect();
        assert_eq!(names, ["Content-Type", "Accept", "X-Trace"]);
    }

    #[test]
    fn duplicates_are_rendered_separately() {
        let set: HeaderFieldSet = [("Cookie", "a=1"), ("Cookie", "b=2")].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.render(), "Cookie: a=1\r\nCookie: b=2\r\n");
    }

    #[test]
    fn values_are_not_validated() {
        let set = HeaderFieldSet::new().with("", "  spaced value ");
        assert_eq!(set.render(), ":   spaced value \r\n");
    }

    #[test]
    fn contains_ignores_case() {
        let set = HeaderFieldSet::new().with("Content-Type", "text/plain");
        assert!(set.contains("content-type"));
        assert!(!set.contains("accept"));
    }
}
