//! Saved command-line defaults.
//!
//! Flags live in a plain file, one or more per line, with `#` comments:
//! a global file under the user config directory and an optional local
//! `.livechartrc`. Local flags override global ones and command-line flags
//! override both.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::state::{Look, Theme};

/// Base URL used for share links when none is configured.
///
/// A local placeholder: real links need `--base-url` pointing at a page that
/// reads the `state` query parameter.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub perf: bool,
    pub theme: Option<Theme>,
    pub look: Option<Look>,
    pub debounce_ms: Option<u64>,
    pub mmdc: Option<PathBuf>,
    pub base_url: Option<String>,
    pub render_debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge two flag sets; `other` wins for valued options.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            perf: self.perf || other.perf,
            theme: other.theme.or(self.theme),
            look: other.look.or(self.look),
            debounce_ms: other.debounce_ms.or(self.debounce_ms),
            mmdc: other.mmdc.clone().or_else(|| self.mmdc.clone()),
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("livechart").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("livechart")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("livechart").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("livechart")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".livechartrc")
}

/// Read flags from `path`; a missing file yields no flags.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// Write `flags` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# livechart defaults (saved with --save)".to_string()];
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(theme) = flags.theme {
        lines.push(format!("--theme {}", theme.name()));
    }
    if let Some(look) = flags.look {
        lines.push(format!("--look {}", look.name()));
    }
    if let Some(ms) = flags.debounce_ms {
        lines.push(format!("--debounce-ms {ms}"));
    }
    if let Some(path) = &flags.mmdc {
        lines.push(format!("--mmdc {}", path.display()));
    }
    if let Some(url) = &flags.base_url {
        lines.push(format!("--base-url {url}"));
    }
    if let Some(path) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", path.display()));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// Remove a saved flag file if present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the known flags out of raw arguments; everything else is ignored.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline_value) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (token, None),
        };
        match name {
            "--watch" | "-w" => flags.watch = true,
            "--perf" => flags.perf = true,
            "--theme" => flags.theme = flag_value(tokens, &mut i, inline_value).and_then(Theme::parse),
            "--look" => flags.look = flag_value(tokens, &mut i, inline_value).and_then(Look::parse),
            "--debounce-ms" => {
                flags.debounce_ms =
                    flag_value(tokens, &mut i, inline_value).and_then(|v| v.parse().ok());
            }
            "--mmdc" => flags.mmdc = flag_value(tokens, &mut i, inline_value).map(PathBuf::from),
            "--base-url" => {
                flags.base_url = flag_value(tokens, &mut i, inline_value).map(ToOwned::to_owned);
            }
            "--render-debug-log" => {
                flags.render_debug_log =
                    flag_value(tokens, &mut i, inline_value).map(PathBuf::from);
            }
            _ => {}
        }
        i += 1;
    }
    flags
}

/// Value of a valued flag: the `=` part if given, else the next token.
fn flag_value<'a>(tokens: &'a [String], i: &mut usize, inline: Option<&'a str>) -> Option<&'a str> {
    if inline.is_some() {
        return inline;
    }
    let next = tokens.get(*i + 1)?;
    *i += 1;
    Some(next.as_str())
}
