use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tempfile::tempdir;

use crate::binding::UrlBinding;
use crate::codec::{Codec, TokenFormat};
use crate::export::ExportError;
use crate::location::Location;
use crate::render::{DiagramRenderer, RenderConfig, RenderError, RenderOrchestrator};
use crate::state::{LOOK_KEY, THEME_KEY, ViewState};
use crate::viewport::Size;

use super::{Direction, Execution, Router, Signal};

const BASE_URL: &str = "https://charts.example/edit";

/// Renders anything whose first word is `graph`, counting calls.
///
/// Sources containing `slow` take a while, to let later renders overtake them.
#[derive(Default)]
struct CountingRenderer {
    calls: Arc<AtomicUsize>,
}

impl DiagramRenderer for CountingRenderer {
    fn render(&self, source: &str, config: &RenderConfig) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if source.contains("slow") {
            std::thread::sleep(Duration::from_millis(150));
        }
        if source.split_whitespace().next() == Some("graph") {
            Ok(format!(
                r#"<svg viewBox="0 0 200 100" data-theme="{}"><text>{}</text></svg>"#,
                config.theme.name(),
                source.len()
            ))
        } else {
            Err(RenderError::Diagram(
                "Parse error on line 1: unexpected token".to_string(),
            ))
        }
    }
}

fn router_at(url: &str) -> (Router<CountingRenderer>, Arc<AtomicUsize>) {
    let renderer = CountingRenderer::default();
    let calls = Arc::clone(&renderer.calls);
    let binding = UrlBinding::new(Location::parse(url), Codec::new(TokenFormat::Deflate));
    let orchestrator = RenderOrchestrator::new(renderer, Size::new(800.0, 600.0));
    let router = Router::load(binding, orchestrator).with_debounce_ms(0);
    (router, calls)
}

fn url_state(router: &Router<CountingRenderer>) -> Option<ViewState> {
    router.binding().load_from_location()
}

fn content(text: &str) -> Signal {
    Signal::ContentChanged(text.to_string())
}

fn option(key: &str, value: &str) -> Signal {
    Signal::OptionChanged {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[test]
fn test_no_token_loads_default_state() {
    let (mut router, _) = router_at(BASE_URL);
    assert_eq!(router.state(), &ViewState::default());

    router.start();
    assert!(router.output().svg().is_some());
    assert_eq!(router.url(), BASE_URL, "page load must not rewrite the URL");
}

#[test]
fn test_token_in_url_is_restored() {
    let saved = ViewState::default()
        .with_content("graph LR\n  X --> Y")
        .with_option(THEME_KEY, "dark");
    let token = Codec::new(TokenFormat::Deflate).encode(&saved);
    let (router, _) = router_at(&format!("{BASE_URL}?state={token}"));
    assert_eq!(router.state(), &saved);
}

#[test]
fn test_garbage_token_falls_back_to_default() {
    let (mut router, _) = router_at(&format!("{BASE_URL}?state=%E0%A4%A"));
    assert_eq!(router.state(), &ViewState::default());
    router.start();
    assert!(router.output().svg().is_some());
}

#[test]
fn test_content_change_renders_then_persists() {
    let (mut router, calls) = router_at(BASE_URL);
    router.start();
    router.handle(content("graph TD\n  A --> B"), 0);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(router.state().content(), "graph TD\n  A --> B");
    assert_eq!(url_state(&router).as_ref(), Some(router.state()));
}

#[test]
fn test_option_change_renders_then_persists() {
    let (mut router, _) = router_at(BASE_URL);
    router.start();
    router.handle(option(THEME_KEY, "forest"), 0);

    assert!(router.output().svg().unwrap().contains(r#"data-theme="forest""#));
    assert_eq!(
        url_state(&router).unwrap().options().get(THEME_KEY),
        Some("forest")
    );
}

#[test]
fn test_unknown_option_value_renders_with_fallback() {
    let (mut router, _) = router_at(BASE_URL);
    router.handle(option(THEME_KEY, "ultraviolet"), 0);

    assert!(router.output().svg().unwrap().contains(r#"data-theme="default""#));
    assert_eq!(
        url_state(&router).unwrap().options().get(THEME_KEY),
        Some("ultraviolet")
    );
}

#[test]
fn test_repeated_option_is_not_rerendered() {
    let (mut router, calls) = router_at(BASE_URL);
    router.handle(option(LOOK_KEY, "handDrawn"), 0);
    let url = router.url();
    router.handle(option(LOOK_KEY, "handDrawn"), 0);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(router.url(), url);
}

#[test]
fn test_render_failure_still_persists() {
    let (mut router, _) = router_at(BASE_URL);
    router.start();
    router.handle(content("not a valid diagram###"), 0);

    let failure = router.output().failure().unwrap();
    assert!(failure.starts_with("Error rendering chart: "));
    assert!(router.output().svg().is_none());
    assert_eq!(
        url_state(&router).unwrap().content(),
        "not a valid diagram###"
    );
}

#[test]
fn test_edits_are_debounced_to_the_last_one() {
    let (router, calls) = router_at(BASE_URL);
    let mut router = router.with_debounce_ms(100);
    router.handle(content("graph TD\n  A"), 0);
    router.handle(content("graph TD\n  A -->"), 30);
    router.handle(content("graph TD\n  A --> B"), 60);

    router.tick(120);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(router.has_pending_edit());

    router.tick(160);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(router.state().content(), "graph TD\n  A --> B");
    assert_eq!(url_state(&router).unwrap().content(), "graph TD\n  A --> B");
}

#[test]
fn test_option_change_flushes_pending_edit() {
    let (router, _) = router_at(BASE_URL);
    let mut router = router.with_debounce_ms(10_000);
    router.handle(content("graph LR\n  edited"), 0);
    router.handle(option(LOOK_KEY, "handDrawn"), 5);

    let saved = url_state(&router).unwrap();
    assert_eq!(saved.content(), "graph LR\n  edited");
    assert_eq!(saved.options().get(LOOK_KEY), Some("handDrawn"));
    assert!(!router.has_pending_edit());
}

#[test]
fn test_back_and_forward_reapply_history() {
    let (mut router, _) = router_at(BASE_URL);
    router.handle(content("graph TD\n  first"), 0);
    let first = router.state().clone();

    router.binding_mut().push(Location::parse(BASE_URL));
    router.handle(content("graph TD\n  second"), 0);
    let second = router.state().clone();

    router.handle(Signal::Navigated(Direction::Back), 0);
    assert_eq!(router.state(), &first);
    assert!(router.output().svg().is_some());
    assert_eq!(url_state(&router).as_ref(), Some(&first));

    router.handle(Signal::Navigated(Direction::Forward), 0);
    assert_eq!(router.state(), &second);
    assert_eq!(router.binding().history().len(), 2);
}

#[test]
fn test_back_to_entry_without_token_restores_default() {
    let (mut router, _) = router_at(BASE_URL);
    router.binding_mut().push(Location::parse(BASE_URL));
    router.handle(content("graph TD\n  edited"), 0);

    router.handle(Signal::Navigated(Direction::Back), 0);
    assert_eq!(router.state(), &ViewState::default());
    router.handle(Signal::Navigated(Direction::Back), 0);
    assert_eq!(router.state(), &ViewState::default());
}

#[test]
fn test_repeated_renders_do_not_leak_resize_listeners() {
    let (mut router, _) = router_at(BASE_URL);
    for i in 0..20 {
        router.handle(content(&format!("graph TD\n  N{i}")), 0);
    }
    assert_eq!(router.orchestrator().view_sync().listener_count(), 1);
}

#[test]
fn test_resize_before_render_is_ignored_and_after_refits() {
    let (mut router, _) = router_at(BASE_URL);
    router.handle(Signal::ContainerResized(Size::new(400.0, 400.0)), 0);
    router.start();

    let zoom = |r: &Router<CountingRenderer>| {
        r.output()
            .session()
            .and_then(|s| s.viewport())
            .map(|v| v.pan_zoom().zoom())
    };
    assert_eq!(zoom(&router), Some(2.0));

    router.handle(Signal::ContainerResized(Size::new(200.0, 100.0)), 0);
    assert_eq!(zoom(&router), Some(1.0));
}

#[test]
fn test_background_last_write_wins() {
    let (router, _) = router_at(BASE_URL);
    let mut router = router.with_execution(Execution::Background);
    router.handle(content("graph TD\n  slow"), 0);
    router.handle(content("graph TD\n  fast"), 0);
    router.wait_idle();

    assert_eq!(router.in_flight(), 0);
    assert_eq!(router.state().content(), "graph TD\n  fast");
    assert_eq!(url_state(&router).unwrap().content(), "graph TD\n  fast");
    let svg = router.output().svg().unwrap();
    assert!(svg.contains(&format!("<text>{}</text>", "graph TD\n  fast".len())));
}

#[test]
fn test_background_output_is_pending_until_pumped() {
    let (router, _) = router_at(BASE_URL);
    let mut router = router.with_execution(Execution::Background);
    router.start();
    assert!(router.output().svg().is_none());
    router.wait_idle();
    assert!(router.output().svg().is_some());
}

#[test]
fn test_export_requires_a_diagram() {
    let dir = tempdir().unwrap();
    let (mut router, _) = router_at(BASE_URL);
    assert!(matches!(
        router.export(dir.path()),
        Err(ExportError::NoDiagram)
    ));

    router.start();
    let path = router.export(dir.path()).unwrap();
    assert!(path.ends_with("chart.svg"));
}
