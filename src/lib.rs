//! Wavelay keeps stacks of static raster images pixel-aligned with a
//! zoomable, horizontally scrolling waveform timeline owned by an external
//! host component.
//!
//! The host drives everything through three lifecycle events: `Ready`
//! triggers the first full layout pass, `Zoom` resizes every layer in
//! place, and `Redraw` re-asserts cursor stacking. The compositor owns its
//! layer elements outright and touches host-owned elements through exactly
//! one capability, paint priority.
//!
//! - Build an [`OverlayOptions`], hand it to [`OverlayCompositor::new`]
//!   (image loading starts immediately, off-thread)
//! - [`attach`](OverlayCompositor::attach) it to anything implementing
//!   [`TimelineHost`]
//! - Forward the host's lifecycle through its event channel
//! - [`destroy`](OverlayCompositor::destroy) releases every subscription
//!   and element
#![forbid(unsafe_code)]

pub mod compositor;
pub mod error;
pub mod events;
pub mod headless;
pub mod host;
pub mod layer;
pub mod loader;
pub mod options;

pub use crate::compositor::{OverlayCompositor, OverlayEvent};
pub use crate::error::{WavelayError, WavelayResult};
pub use crate::events::{Emitter, Subscription};
pub use crate::headless::{ElementId, ElementRecord, HeadlessHost};
pub use crate::host::{ElementStyle, HostEvent, RenderPatch, TimelineHost};
pub use crate::layer::{
    CURSOR_PRIORITY, Layer, OVERLAY_BASE_PRIORITY, SURFACE_PRIORITY, UNDERLAY_TOP_PRIORITY,
    ViewportState, WRAPPER_PRIORITY, paint_priority,
};
pub use crate::loader::{LayerLoader, LoadState, LoadedImage, load_all};
pub use crate::options::{
    DEFAULT_OPACITY, ImageRendering, OpacitySpec, OverlayOptions, Position,
};
