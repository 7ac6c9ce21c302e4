//! The persisted unit: diagram source plus display options.
//!
//! A [`ViewState`] never changes after construction. Every edit, option
//! change or navigation produces a fresh value.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Option key selecting the visual palette.
pub const THEME_KEY: &str = "theme";

/// Option key selecting the rendering style.
pub const LOOK_KEY: &str = "look";

/// Sample diagram shown when no state is present in the link.
pub const DEFAULT_CONTENT: &str = "\
graph TD
    A[Christmas] -->|Get money| B(Go shopping)
    B --> C{Let me think}
    C -->|One| D[Laptop]
    C -->|Two| E[iPhone]
    C -->|Three| F[Car]
";

/// Visual palette understood by the rendering engine.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Theme {
    #[default]
    Default,
    Neutral,
    Dark,
    Forest,
    Base,
}

impl Theme {
    /// Every recognized theme, in selector order.
    pub const ALL: [Self; 5] = [
        Self::Default,
        Self::Neutral,
        Self::Dark,
        Self::Forest,
        Self::Base,
    ];

    /// Parse a theme name, falling back to [`Theme::Default`] for anything unknown.
    pub fn from_name(name: Option<&str>) -> Self {
        Self::parse(name.unwrap_or_default()).unwrap_or_default()
    }

    /// Strict parse used by the config layer.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|theme| theme.name() == name)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Neutral => "neutral",
            Self::Dark => "dark",
            Self::Forest => "forest",
            Self::Base => "base",
        }
    }
}

/// Rendering style understood by the rendering engine.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Look {
    #[default]
    Classic,
    #[value(name = "handDrawn")]
    HandDrawn,
}

impl Look {
    pub const ALL: [Self; 2] = [Self::Classic, Self::HandDrawn];

    /// Parse a look name, falling back to [`Look::Classic`] for anything unknown.
    pub fn from_name(name: Option<&str>) -> Self {
        Self::parse(name.unwrap_or_default()).unwrap_or_default()
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|look| look.name() == name)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::HandDrawn => "handDrawn",
        }
    }
}

/// Display options keyed by name.
///
/// Only `theme` and `look` are interpreted. Any other key is kept verbatim
/// so links produced by newer builds survive a round trip through older ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(BTreeMap<String, String>);

impl Options {
    /// Raw value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Interpreted theme (unknown values fall back to the default palette).
    pub fn theme(&self) -> Theme {
        Theme::from_name(self.get(THEME_KEY))
    }

    /// Interpreted look (unknown values fall back to the classic style).
    pub fn look(&self) -> Look {
        Look::from_name(self.get(LOOK_KEY))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    fn with(&self, key: &str, value: &str) -> Self {
        let mut map = self.0.clone();
        map.insert(key.to_string(), value.to_string());
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Options {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Diagram source text plus display options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewState {
    content: String,
    #[serde(default)]
    options: Options,
}

impl ViewState {
    pub fn new(content: impl Into<String>, options: Options) -> Self {
        Self {
            content: content.into(),
            options,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// A copy of this state with different diagram source.
    #[must_use]
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            options: self.options.clone(),
        }
    }

    /// A copy of this state with one option set.
    #[must_use]
    pub fn with_option(&self, key: &str, value: &str) -> Self {
        Self {
            content: self.content.clone(),
            options: self.options.with(key, value),
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(
            DEFAULT_CONTENT,
            [
                (THEME_KEY, Theme::Default.name()),
                (LOOK_KEY, Look::Classic.name()),
            ]
            .into_iter()
            .collect(),
        )
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes, theme={}, look={}",
            self.content.len(),
            self.options.get(THEME_KEY).unwrap_or("-"),
            self.options.get(LOOK_KEY).unwrap_or("-"),
        )
    }
}
