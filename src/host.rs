//! The contract a timeline host must satisfy.
//!
//! The compositor never walks the host's scene freely. Everything it needs
//! is expressed as a handful of queries, one event channel, and a narrow
//! set of scene capabilities; the only mutation it performs on host-owned
//! elements is [`set_paint_priority`](TimelineHost::set_paint_priority).
//! Real timeline bindings and the in-memory [`HeadlessHost`] both implement
//! this trait, which keeps the frame logic testable without a scene graph.
//!
//! [`HeadlessHost`]: crate::headless::HeadlessHost

use std::fmt;

use crate::events::Emitter;
use crate::options::ImageRendering;

/// Lifecycle notifications published by the host timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HostEvent {
    /// The timeline finished its own layout and can be queried.
    Ready,
    /// The zoom level changed; payload is the new pixels-per-second scale.
    Zoom(f64),
    /// The host redrew its surfaces and may have recreated its cursor.
    Redraw,
}

/// Partial override of the host's own rendering options. Only ever used to
/// force a transparent waveform when the overlay hides it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPatch {
    /// Replacement waveform color, passed through verbatim.
    pub wave_color: Option<String>,
}

impl RenderPatch {
    pub fn transparent_waveform() -> Self {
        Self {
            wave_color: Some("transparent".to_string()),
        }
    }
}

/// Attribute values for one compositor-owned element, in host-scene terms:
/// pixel widths, priority integers, opacity floats, color strings verbatim.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementStyle {
    /// Stable part name (`overlay-wrapper`, `overlay-layer-{index}`).
    pub part: String,
    /// Element width in pixels. `None` stretches to the parent.
    pub width_px: Option<f64>,
    /// Background image source identifier, verbatim.
    pub background_image: Option<String>,
    /// Horizontal background scale in pixels; the vertical scale always
    /// stretches to the element's full height.
    pub background_width_px: Option<f64>,
    /// Background color string, verbatim.
    pub background_color: Option<String>,
    /// 0..=1.
    pub opacity: f64,
    pub paint_priority: Option<i32>,
    pub image_rendering: ImageRendering,
    /// `false` makes the element invisible to pointer interaction.
    pub hit_testable: bool,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            part: String::new(),
            width_px: None,
            background_image: None,
            background_width_px: None,
            background_color: None,
            opacity: 1.0,
            paint_priority: None,
            image_rendering: ImageRendering::Auto,
            hit_testable: true,
        }
    }
}

impl ElementStyle {
    /// Style of the compositor's own mount wrapper: full-size, transparent
    /// to pointer interaction, no painting of its own.
    pub fn wrapper() -> Self {
        Self {
            part: "overlay-wrapper".to_string(),
            hit_testable: false,
            ..Self::default()
        }
    }
}

/// Cheap-clone handle onto the external timeline component.
///
/// Implementations are expected to use interior mutability; every method
/// takes `&self` so handles can be captured by event callbacks. Scene
/// methods must not synchronously publish host events — dispatch happens
/// between, never inside, compositor passes.
pub trait TimelineHost: Clone + 'static {
    /// Handle to one element in the host's scene.
    type Element: Clone + PartialEq + fmt::Debug + 'static;

    /// The host's event channel. The returned handle stays valid after the
    /// call and shares subscriber state with every other handle.
    fn events(&self) -> Emitter<HostEvent>;

    /// Current media duration in seconds, if the host knows one.
    fn duration(&self) -> Option<f64>;

    /// Current scrollable content width in pixels.
    fn scrollable_width(&self) -> f64;

    /// The host's default content wrapper, the fallback mount target.
    fn mount_wrapper(&self) -> Self::Element;

    /// Resolves an explicit container selector, if it matches anything.
    fn resolve_container(&self, selector: &str) -> Option<Self::Element>;

    /// Applies a partial render-option override on the host itself.
    fn set_render_options(&self, patch: &RenderPatch);

    /// Creates an element under `parent` with the given attributes and
    /// returns its handle.
    fn create_element(&self, parent: &Self::Element, style: &ElementStyle) -> Self::Element;

    /// Updates an element's width and horizontal background scale together,
    /// in place.
    fn resize_element(&self, element: &Self::Element, width_px: f64);

    /// Removes an element (and any children it owns) from the scene.
    fn remove_element(&self, element: &Self::Element);

    /// Sets the paint priority of one element. The single capability the
    /// compositor is granted over host-owned elements.
    fn set_paint_priority(&self, element: &Self::Element, priority: i32);

    /// The host's own drawing surfaces (waveform canvases).
    fn drawing_surfaces(&self) -> Vec<Self::Element>;

    /// The host's playback cursor element(s). May change identity across
    /// redraws.
    fn cursor_elements(&self) -> Vec<Self::Element>;
}
