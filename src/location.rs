//! Page locations and session history.
//!
//! [`Location`] keeps query values in their raw (escaped) form; escaping is
//! the codec's job. [`History`] mirrors a browser session history closely
//! enough for replace-state persistence and back/forward navigation.

use std::fmt;

/// A page URL split into base, query pairs and fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    base: String,
    query: Vec<(String, String)>,
    fragment: Option<String>,
}

impl Location {
    /// Split `url` into parts. Never fails: anything without `?` is all base.
    pub fn parse(url: &str) -> Self {
        let (rest, fragment) = match url.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (url, None),
        };
        let (base, query) = match rest.split_once('?') {
            Some((base, query)) => (base, query),
            None => (rest, ""),
        };
        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();
        Self {
            base: base.to_string(),
            query,
            fragment,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Raw value of the first `name` parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Copy of this location with `name` set to the raw `value`.
    ///
    /// The first existing `name` keeps its position; later duplicates are dropped.
    #[must_use]
    pub fn with_param(&self, name: &str, value: &str) -> Self {
        let mut query = Vec::with_capacity(self.query.len() + 1);
        let mut replaced = false;
        for (key, existing) in &self.query {
            if key == name {
                if !replaced {
                    query.push((key.clone(), value.to_string()));
                    replaced = true;
                }
            } else {
                query.push((key.clone(), existing.clone()));
            }
        }
        if !replaced {
            query.push((name.to_string(), value.to_string()));
        }
        Self {
            base: self.base.clone(),
            query,
            fragment: self.fragment.clone(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        for (i, (key, value)) in self.query.iter().enumerate() {
            f.write_str(if i == 0 { "?" } else { "&" })?;
            if value.is_empty() {
                f.write_str(key)?;
            } else {
                write!(f, "{key}={value}")?;
            }
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// In-memory session history with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Location>,
    index: usize,
}

impl History {
    pub fn new(initial: Location) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
        }
    }

    pub fn current(&self) -> &Location {
        &self.entries[self.index]
    }

    /// Overwrite the current entry without creating a new one.
    pub fn replace(&mut self, location: Location) {
        self.entries[self.index] = location;
    }

    /// Add a new entry after the current one, discarding any forward entries.
    pub fn push(&mut self, location: Location) {
        self.entries.truncate(self.index + 1);
        self.entries.push(location);
        self.index += 1;
    }

    /// Step back one entry. Returns `None` at the oldest entry.
    pub fn back(&mut self) -> Option<&Location> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(self.current())
    }

    /// Step forward one entry. Returns `None` at the newest entry.
    pub fn forward(&mut self) -> Option<&Location> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(self.current())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_round_trip() {
        let url = "https://example.com/edit?lang=en&state=abc%3D#top";
        let loc = Location::parse(url);
        assert_eq!(loc.base(), "https://example.com/edit");
        assert_eq!(loc.param("state"), Some("abc%3D"));
        assert_eq!(loc.to_string(), url);
    }

    #[test]
    fn test_missing_param_is_none() {
        let loc = Location::parse("https://example.com/");
        assert_eq!(loc.param("state"), None);
    }

    #[test]
    fn test_with_param_replaces_in_place() {
        let loc = Location::parse("/edit?a=1&state=old&b=2#f");
        assert_eq!(
            loc.with_param("state", "new").to_string(),
            "/edit?a=1&state=new&b=2#f"
        );
    }

    #[test]
    fn test_with_param_appends_when_absent() {
        let loc = Location::parse("/edit#f");
        assert_eq!(loc.with_param("state", "x").to_string(), "/edit?state=x#f");
    }

    #[test]
    fn test_with_param_drops_duplicates() {
        let loc = Location::parse("/?state=1&state=2");
        assert_eq!(loc.with_param("state", "3").to_string(), "/?state=3");
    }

    #[test]
    fn test_replace_does_not_grow_history() {
        let mut history = History::new(Location::parse("/"));
        history.replace(Location::parse("/?state=a"));
        history.replace(Location::parse("/?state=b"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.current().param("state"), Some("b"));
    }

    #[test]
    fn test_back_and_forward() {
        let mut history = History::new(Location::parse("/?state=a"));
        history.push(Location::parse("/?state=b"));
        assert_eq!(history.back().and_then(|l| l.param("state")), Some("a"));
        assert!(history.back().is_none());
        assert_eq!(history.forward().and_then(|l| l.param("state")), Some("b"));
        assert!(history.forward().is_none());
    }

    #[test]
    fn test_push_truncates_forward_entries() {
        let mut history = History::new(Location::parse("/?state=a"));
        history.push(Location::parse("/?state=b"));
        history.back();
        history.push(Location::parse("/?state=c"));
        assert_eq!(history.len(), 2);
        assert!(history.forward().is_none());
    }
}
