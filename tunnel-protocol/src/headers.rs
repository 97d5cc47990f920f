use serde::{Deserialize, Serialize};

/// An ordered, case-insensitive multimap of HTTP header names to values.
///
/// The distilled spec's source folds repeated headers with last-write-wins;
/// this implementation deliberately does not (see `SPEC_FULL.md` §4,
/// resolved Open Question 1) so that multi-valued headers such as
/// `Set-Cookie` survive a round trip through the tunnel intact. Lookup is
/// case-insensitive per RFC 7230; storage preserves the original casing and
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a header, keeping any existing values for the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Returns the first value matching `name`, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).next()
    }

    /// Returns every value matching `name`, case-insensitively, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.0
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_multiplicity_and_order() {
        let mut h = Headers::new();
        h.push("Set-Cookie", "a=1");
        h.push("set-cookie", "b=2");
        h.push("Content-Type", "text/plain");

        let cookies: Vec<&str> = h.get_all("SET-COOKIE").collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(h.get("content-type"), Some("text/plain"));
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn missing_header_is_none() {
        let h = Headers::new();
        assert_eq!(h.get("x-missing"), None);
    }
}
