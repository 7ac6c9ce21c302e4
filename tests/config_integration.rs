use std::path::PathBuf;

use livechart::config::{ConfigFlags, load_config_flags, parse_flag_tokens};
use livechart::state::{Look, Theme};

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".livechartrc");
    let content = r"
# comment
--watch

--theme forest

--render-debug-log=render.log
";
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.watch);
    assert_eq!(flags.theme, Some(Theme::Forest));
    assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
}

#[test]
fn test_missing_config_file_yields_no_flags() {
    let dir = tempfile::tempdir().unwrap();
    let flags = load_config_flags(&dir.path().join("absent")).unwrap();
    assert_eq!(flags, ConfigFlags::default());
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".livechartrc");
    let content = "--watch\n--theme neutral\n--look handDrawn\n--render-debug-log file.log\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "livechart".to_string(),
        "--theme".to_string(),
        "dark".to_string(),
        "--debounce-ms".to_string(),
        "75".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.watch, "file flags should remain enabled");
    assert_eq!(effective.debounce_ms, Some(75), "cli flags should be applied");
    assert_eq!(effective.theme, Some(Theme::Dark), "cli should override theme");
    assert_eq!(effective.look, Some(Look::HandDrawn));
    assert_eq!(
        effective.render_debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_parse_flag_tokens_handles_equals_syntax() {
    let args = vec![
        "livechart".to_string(),
        "--theme=dark".to_string(),
        "--base-url=https://charts.example/edit".to_string(),
        "--mmdc=/usr/local/bin/mmdc".to_string(),
    ];
    let flags = parse_flag_tokens(&args);
    assert_eq!(flags.theme, Some(Theme::Dark));
    assert_eq!(flags.base_url(), "https://charts.example/edit");
    assert_eq!(flags.mmdc, Some(PathBuf::from("/usr/local/bin/mmdc")));
}

#[test]
fn test_valued_flag_at_end_without_value_is_ignored() {
    let flags = parse_flag_tokens(&["--look".to_string()]);
    assert_eq!(flags.look, None);
}
