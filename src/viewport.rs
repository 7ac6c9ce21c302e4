//! Pan/zoom viewport over rendered SVG output.
//!
//! [`PanZoom`] is the controller: a zoom factor and a pan offset mapping the
//! diagram's own coordinate box onto a container. [`ViewSync`] binds one
//! controller to the displayed diagram and owns the resize-listener
//! registry, so a detached handle can never keep receiving resizes.
//!
//! # Example
//!
//! ```
//! use livechart::viewport::{PanZoom, Size, ViewBox};
//!
//! let mut pz = PanZoom::new(ViewBox::new(0.0, 0.0, 200.0, 100.0), Size::new(400.0, 400.0));
//! pz.fit();
//! pz.center();
//! assert_eq!(pz.zoom(), 2.0);
//! assert_eq!(pz.visible_box(), ViewBox::new(0.0, -50.0, 200.0, 200.0));
//! ```

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Smallest zoom factor reachable through [`PanZoom::zoom_by`].
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom factor reachable through [`PanZoom::zoom_by`].
pub const MAX_ZOOM: f64 = 10.0;

static SVG_OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<svg\b[^>]*>").expect("valid svg tag regex"));
static VIEW_BOX_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bviewBox\s*=\s*["']([^"']+)["']"#).expect("valid viewBox regex"));
static WIDTH_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\swidth\s*=\s*["']\s*([0-9.]+)\s*(?:px)?\s*["']"#).expect("valid width regex")
});
static HEIGHT_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\sheight\s*=\s*["']\s*([0-9.]+)\s*(?:px)?\s*["']"#).expect("valid height regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    #[error("output has no <svg> root element")]
    NotSvg,
    #[error("output has no usable viewBox or width/height")]
    UnknownSize,
    #[error("container has no area ({width}x{height})")]
    EmptyContainer { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn has_area(self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// A rectangle in diagram coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Read the intrinsic box of an SVG document from its root element.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no `<svg>` element or no positive size.
    pub fn from_svg(svg: &str) -> Result<Self, AttachError> {
        let tag = SVG_OPEN_TAG.find(svg).ok_or(AttachError::NotSvg)?.as_str();

        if let Some(caps) = VIEW_BOX_ATTR.captures(tag) {
            let parts: Vec<f64> = caps[1]
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|part| !part.is_empty())
                .filter_map(|part| part.parse().ok())
                .collect();
            if let [x, y, width, height] = parts[..]
                && width > 0.0
                && height > 0.0
            {
                return Ok(Self::new(x, y, width, height));
            }
        }

        let dimension = |re: &Regex| {
            re.captures(tag)
                .and_then(|caps| caps[1].parse::<f64>().ok())
                .filter(|v| *v > 0.0)
        };
        match (dimension(&WIDTH_ATTR), dimension(&HEIGHT_ATTR)) {
            (Some(width), Some(height)) => Ok(Self::new(0.0, 0.0, width, height)),
            _ => Err(AttachError::UnknownSize),
        }
    }
}

/// Pan/zoom state for one diagram inside one container.
#[derive(Debug, Clone, PartialEq)]
pub struct PanZoom {
    content: ViewBox,
    container: Size,
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
}

impl PanZoom {
    pub const fn new(content: ViewBox, container: Size) -> Self {
        Self {
            content,
            container,
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    pub const fn zoom(&self) -> f64 {
        self.zoom
    }

    pub const fn pan(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    pub const fn container(&self) -> Size {
        self.container
    }

    pub const fn content(&self) -> ViewBox {
        self.content
    }

    /// Adopt a new container size. Zoom and pan are left alone.
    pub const fn resize(&mut self, container: Size) {
        self.container = container;
    }

    /// Scale so the whole diagram fits the container.
    pub fn fit(&mut self) {
        if !self.container.has_area() {
            return;
        }
        let zoom = (self.container.width / self.content.width)
            .min(self.container.height / self.content.height);
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Pan so the diagram's center sits at the container's center.
    pub fn center(&mut self) {
        self.pan_x =
            (self.container.width - self.content.width * self.zoom) / 2.0 - self.content.x * self.zoom;
        self.pan_y = (self.container.height - self.content.height * self.zoom) / 2.0
            - self.content.y * self.zoom;
    }

    /// Multiply the zoom by `factor`, keeping the container center fixed.
    pub fn zoom_by(&mut self, factor: f64) {
        if factor <= 0.0 {
            return;
        }
        let next = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let ratio = next / self.zoom;
        let cx = self.container.width / 2.0;
        let cy = self.container.height / 2.0;
        self.pan_x = cx - (cx - self.pan_x) * ratio;
        self.pan_y = cy - (cy - self.pan_y) * ratio;
        self.zoom = next;
    }

    /// Move the diagram by a container-space offset.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// The part of the diagram currently visible, in diagram coordinates.
    pub fn visible_box(&self) -> ViewBox {
        ViewBox::new(
            -self.pan_x / self.zoom,
            -self.pan_y / self.zoom,
            self.container.width / self.zoom,
            self.container.height / self.zoom,
        )
    }
}

/// A pan/zoom controller attached to the displayed diagram.
///
/// Not `Clone`: the only way to drop one is [`ViewSync::detach`], which also
/// removes its resize listener.
#[derive(Debug)]
pub struct ViewportHandle {
    listener: u64,
    pan_zoom: PanZoom,
}

impl ViewportHandle {
    pub const fn pan_zoom(&self) -> &PanZoom {
        &self.pan_zoom
    }

    pub const fn pan_zoom_mut(&mut self) -> &mut PanZoom {
        &mut self.pan_zoom
    }
}

/// Binds pan/zoom controllers to rendered output and tracks the container.
#[derive(Debug)]
pub struct ViewSync {
    container: Size,
    listeners: BTreeSet<u64>,
    next_listener: u64,
}

impl ViewSync {
    pub const fn new(container: Size) -> Self {
        Self {
            container,
            listeners: BTreeSet::new(),
            next_listener: 0,
        }
    }

    pub const fn container(&self) -> Size {
        self.container
    }

    /// Number of live resize listeners. At most one while output is shown.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Attach a fitted and centered controller to freshly rendered `svg`.
    ///
    /// # Errors
    ///
    /// Returns an error when the output or container size is unknown; the
    /// output stays displayable without a viewport.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn attach(&mut self, svg: &str) -> Result<ViewportHandle, AttachError> {
        if !self.container.has_area() {
            return Err(AttachError::EmptyContainer {
                width: self.container.width.max(0.0) as u32,
                height: self.container.height.max(0.0) as u32,
            });
        }
        let content = ViewBox::from_svg(svg)?;
        let mut pan_zoom = PanZoom::new(content, self.container);
        pan_zoom.fit();
        pan_zoom.center();

        self.next_listener += 1;
        let listener = self.next_listener;
        self.listeners.insert(listener);
        debug!(listener, zoom = pan_zoom.zoom(), "viewport attached");
        Ok(ViewportHandle { listener, pan_zoom })
    }

    /// Release a controller and its resize listener.
    pub fn detach(&mut self, handle: ViewportHandle) {
        self.listeners.remove(&handle.listener);
        debug!(listener = handle.listener, "viewport detached");
    }

    /// Record a new container size and refit the attached controller, if any.
    pub fn on_container_resize(&mut self, size: Size, handle: Option<&mut ViewportHandle>) {
        self.container = size;
        let Some(handle) = handle else {
            return;
        };
        if !self.listeners.contains(&handle.listener) {
            return;
        }
        handle.pan_zoom.resize(size);
        handle.pan_zoom.fit();
        handle.pan_zoom.center();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERMAID_SVG: &str = r#"<svg aria-roledescription="flowchart-v2" width="100%" xmlns="http://www.w3.org/2000/svg" style="max-width: 200px;" viewBox="-8 -8 200 100" id="graph"><g></g></svg>"#;

    #[test]
    fn test_view_box_from_mermaid_svg() {
        let vb = ViewBox::from_svg(MERMAID_SVG).unwrap();
        assert_eq!(vb, ViewBox::new(-8.0, -8.0, 200.0, 100.0));
    }

    #[test]
    fn test_view_box_from_width_and_height() {
        let svg = r#"<?xml version="1.0"?><svg width="120px" height="40" xmlns="http://www.w3.org/2000/svg"></svg>"#;
        assert_eq!(
            ViewBox::from_svg(svg).unwrap(),
            ViewBox::new(0.0, 0.0, 120.0, 40.0)
        );
    }

    #[test]
    fn test_view_box_requires_svg_root() {
        assert_eq!(
            ViewBox::from_svg("<p>Error</p>"),
            Err(AttachError::NotSvg)
        );
    }

    #[test]
    fn test_view_box_requires_size() {
        assert_eq!(
            ViewBox::from_svg(r#"<svg width="100%"></svg>"#),
            Err(AttachError::UnknownSize)
        );
    }

    #[test]
    fn test_fit_and_center_offset_view_box() {
        let mut pz = PanZoom::new(ViewBox::new(-8.0, -8.0, 200.0, 100.0), Size::new(400.0, 400.0));
        pz.fit();
        pz.center();
        assert_eq!(pz.zoom(), 2.0);
        let visible = pz.visible_box();
        assert_eq!(visible.x, -8.0);
        assert_eq!(visible.width, 200.0);
        // Centered vertically: 50 units of slack above and below.
        assert_eq!(visible.y, -58.0);
    }

    #[test]
    fn test_zoom_by_keeps_center_and_clamps() {
        let mut pz = PanZoom::new(ViewBox::new(0.0, 0.0, 100.0, 100.0), Size::new(100.0, 100.0));
        pz.fit();
        pz.center();
        pz.zoom_by(2.0);
        assert_eq!(pz.visible_box(), ViewBox::new(25.0, 25.0, 50.0, 50.0));
        pz.zoom_by(1000.0);
        assert_eq!(pz.zoom(), MAX_ZOOM);
        pz.zoom_by(0.000_001);
        assert_eq!(pz.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_pan_by_shifts_visible_box() {
        let mut pz = PanZoom::new(ViewBox::new(0.0, 0.0, 100.0, 100.0), Size::new(100.0, 100.0));
        pz.pan_by(10.0, -20.0);
        assert_eq!(pz.visible_box(), ViewBox::new(-10.0, 20.0, 100.0, 100.0));
    }

    #[test]
    fn test_attach_requires_container_area() {
        let mut sync = ViewSync::new(Size::new(0.0, 300.0));
        assert_eq!(
            sync.attach(MERMAID_SVG).unwrap_err(),
            AttachError::EmptyContainer {
                width: 0,
                height: 300
            }
        );
        assert_eq!(sync.listener_count(), 0);
    }

    #[test]
    fn test_detach_before_attach_keeps_one_listener() {
        let mut sync = ViewSync::new(Size::new(800.0, 600.0));
        let mut handle = sync.attach(MERMAID_SVG).unwrap();
        for _ in 0..10 {
            sync.detach(handle);
            handle = sync.attach(MERMAID_SVG).unwrap();
        }
        assert_eq!(sync.listener_count(), 1);
        sync.detach(handle);
        assert_eq!(sync.listener_count(), 0);
    }

    #[test]
    fn test_resize_without_viewport_is_noop() {
        let mut sync = ViewSync::new(Size::new(800.0, 600.0));
        sync.on_container_resize(Size::new(1024.0, 768.0), None);
        assert_eq!(sync.container(), Size::new(1024.0, 768.0));
    }

    #[test]
    fn test_resize_refits_attached_viewport() {
        let mut sync = ViewSync::new(Size::new(200.0, 100.0));
        let mut handle = sync.attach(MERMAID_SVG).unwrap();
        assert_eq!(handle.pan_zoom().zoom(), 1.0);

        sync.on_container_resize(Size::new(400.0, 400.0), Some(&mut handle));
        assert_eq!(handle.pan_zoom().zoom(), 2.0);
        assert_eq!(handle.pan_zoom().container(), Size::new(400.0, 400.0));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn zoom_stays_within_bounds(
                factors in proptest::collection::vec(0.01f64..50.0, 0..20),
            ) {
                let mut pz = PanZoom::new(ViewBox::new(0.0, 0.0, 300.0, 200.0), Size::new(640.0, 480.0));
                pz.fit();
                for factor in factors {
                    pz.zoom_by(factor);
                    prop_assert!((MIN_ZOOM..=MAX_ZOOM).contains(&pz.zoom()));
                }
            }

            #[test]
            fn fit_shows_whole_diagram(
                width in 1.0f64..5000.0,
                height in 1.0f64..5000.0,
                container_w in 1.0f64..3000.0,
                container_h in 1.0f64..3000.0,
            ) {
                // Skip setups where the zoom clamp kicks in.
                let ideal = (container_w / width).min(container_h / height);
                prop_assume!((MIN_ZOOM..=MAX_ZOOM).contains(&ideal));

                let content = ViewBox::new(0.0, 0.0, width, height);
                let mut pz = PanZoom::new(content, Size::new(container_w, container_h));
                pz.fit();
                pz.center();
                let visible = pz.visible_box();
                let eps = 1e-6 * width.max(height);
                prop_assert!(visible.x <= eps);
                prop_assert!(visible.y <= eps);
                prop_assert!(visible.x + visible.width >= width - eps);
                prop_assert!(visible.y + visible.height >= height - eps);
            }
        }
    }
}
