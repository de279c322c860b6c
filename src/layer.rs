//! Viewport geometry and stacking rules.

use crate::host::ElementStyle;
use crate::loader::LoadedImage;
use crate::options::{Position, ResolvedOptions};

/// The host cursor paints above everything, in both modes.
pub const CURSOR_PRIORITY: i32 = 300;
/// Bottom overlay layer; layer `i` paints at `200 + i`.
pub const OVERLAY_BASE_PRIORITY: i32 = 200;
/// Host drawing surfaces when pushed between underlay and overlay stacks.
pub const SURFACE_PRIORITY: i32 = 150;
/// Host content wrapper when the stack runs underneath it.
pub const WRAPPER_PRIORITY: i32 = 100;
/// Topmost underlay layer; lower indices step further down from here.
pub const UNDERLAY_TOP_PRIORITY: i32 = -5;

/// Timeline extent as of the last time the host was asked.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
    /// Seconds. Zero when neither the host nor the configuration knows.
    pub duration: f64,
    pub px_per_sec: f64,
}

impl ViewportState {
    /// Resolves the viewport from the host's answers, falling back to the
    /// configured duration. A missing or non-positive duration yields the
    /// degenerate zero-width viewport rather than an error.
    pub fn resolve(
        host_duration: Option<f64>,
        configured_duration: Option<f64>,
        scrollable_width: f64,
    ) -> Self {
        let duration = host_duration.or(configured_duration).unwrap_or(0.0);
        if duration <= 0.0 || !duration.is_finite() {
            return Self {
                duration: 0.0,
                px_per_sec: 0.0,
            };
        }
        Self {
            duration,
            px_per_sec: scrollable_width / duration,
        }
    }

    /// Total pixel width of the timeline at the current scale.
    pub fn total_width(&self) -> f64 {
        self.duration * self.px_per_sec
    }

    /// Same duration at a new scale (the cheap zoom path).
    pub fn zoomed(&self, px_per_sec: f64) -> Self {
        Self {
            duration: self.duration,
            px_per_sec,
        }
    }
}

/// Paint priority of layer `index` out of `count` configured layers.
///
/// Strictly increasing with index in both modes. Overlay layers sit above
/// the host surfaces, underlay layers below them with the topmost at
/// [`UNDERLAY_TOP_PRIORITY`]; the cursor outranks everything.
pub fn paint_priority(position: Position, index: usize, count: usize) -> i32 {
    match position {
        Position::Overlay => OVERLAY_BASE_PRIORITY + index as i32,
        Position::Underlay => UNDERLAY_TOP_PRIORITY - count.saturating_sub(index + 1) as i32,
    }
}

/// One composited image layer and the scene element it exclusively owns.
#[derive(Clone, Debug)]
pub struct Layer<E> {
    /// Source index; also the paint-order index.
    pub index: usize,
    pub image: LoadedImage,
    pub opacity: f64,
    pub element: E,
}

/// Derives the full attribute set for layer `index` at the given total
/// timeline width. The background color applies to the bottom layer only.
pub(crate) fn layer_style(
    options: &ResolvedOptions,
    image: &LoadedImage,
    index: usize,
    total_width: f64,
) -> ElementStyle {
    ElementStyle {
        part: format!("overlay-layer-{index}"),
        width_px: Some(total_width),
        background_image: Some(image.source.clone()),
        background_width_px: Some(total_width),
        background_color: if index == 0 {
            options.background_color.clone()
        } else {
            None
        },
        opacity: options.opacities[index],
        paint_priority: Some(paint_priority(
            options.position,
            index,
            options.sources.len(),
        )),
        image_rendering: options.image_rendering,
        hit_testable: true,
    }
}
