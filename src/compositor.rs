//! The overlay compositor lifecycle.
//!
//! One compositor owns one wrapper element and the layer elements inside
//! it. It reacts to three host channels: `Ready` runs the first full layout
//! pass and arms the steady-state subscriptions, `Zoom` resizes layers in
//! place, `Redraw` re-asserts cursor stacking (or relayouts when the host
//! geometry actually changed). `destroy` releases every subscription and
//! element and turns all further callbacks into no-ops.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::error::{WavelayError, WavelayResult};
use crate::events::{Emitter, Subscription};
use crate::host::{ElementStyle, HostEvent, RenderPatch, TimelineHost};
use crate::layer::{
    self, CURSOR_PRIORITY, Layer, SURFACE_PRIORITY, ViewportState, WRAPPER_PRIORITY,
};
use crate::loader::{LayerLoader, LoadState, LoadedImage};
use crate::options::{OverlayOptions, Position, ResolvedOptions};

/// Events the compositor publishes to its own subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayEvent {
    /// A layout pass completed; every then-loaded layer is painted.
    Ready,
    /// Resources were released.
    Destroy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Unattached,
    AttachedPending,
    Composited,
    Destroyed,
}

struct Inner<H: TimelineHost> {
    options: ResolvedOptions,
    loader: LayerLoader,
    phase: Phase,
    host: Option<H>,
    wrapper: Option<H::Element>,
    layers: Vec<Layer<H::Element>>,
    viewport: Option<ViewportState>,
    subscriptions: Vec<Subscription>,
    events: Emitter<OverlayEvent>,
}

/// Keeps a stack of image layers sized, positioned, and stacked in lockstep
/// with a host timeline.
pub struct OverlayCompositor<H: TimelineHost> {
    inner: Rc<RefCell<Inner<H>>>,
}

impl<H: TimelineHost> OverlayCompositor<H> {
    /// Validates the configuration and immediately begins loading every
    /// image source. The host can be attached later.
    pub fn new(options: OverlayOptions) -> WavelayResult<Self> {
        let resolved = options.resolve()?;
        let loader = LayerLoader::spawn(&resolved.sources);
        Ok(Self {
            inner: Rc::new(RefCell::new(Inner {
                options: resolved,
                loader,
                phase: Phase::Unattached,
                host: None,
                wrapper: None,
                layers: Vec::new(),
                viewport: None,
                subscriptions: Vec::new(),
                events: Emitter::new(),
            })),
        })
    }

    /// Binds to the host's lifecycle: resolves the mount target, creates
    /// the owned wrapper, applies the hide-waveform override (once, before
    /// any layout), and subscribes to `Ready`.
    ///
    /// Fails with `HostUnavailable` after [`destroy`](Self::destroy) and
    /// with `MissingMountTarget` when an explicit container selector
    /// resolves to nothing; a failed attach has no scene side effects.
    pub fn attach(&self, host: &H) -> WavelayResult<()> {
        let mut inner = self.inner.borrow_mut();
        match inner.phase {
            Phase::Unattached => {}
            Phase::Destroyed => {
                return Err(WavelayError::host_unavailable(
                    "attach called after destroy",
                ));
            }
            Phase::AttachedPending | Phase::Composited => {
                return Err(WavelayError::invalid_configuration(
                    "compositor is already attached",
                ));
            }
        }

        let mount = match inner.options.container.as_deref() {
            Some(selector) => host
                .resolve_container(selector)
                .ok_or_else(|| WavelayError::missing_mount_target(selector))?,
            None => host.mount_wrapper(),
        };

        let wrapper = host.create_element(&mount, &ElementStyle::wrapper());

        if inner.options.hide_waveform {
            host.set_render_options(&RenderPatch::transparent_waveform());
        }

        let weak = Rc::downgrade(&self.inner);
        let ready_sub = host.events().on(move |event| {
            if matches!(event, HostEvent::Ready) {
                Self::handle_ready(&weak);
            }
        });

        inner.host = Some(host.clone());
        inner.wrapper = Some(wrapper);
        inner.subscriptions.push(ready_sub);
        inner.phase = Phase::AttachedPending;
        debug!(layers = inner.options.sources.len(), "overlay attached, waiting for host ready");
        Ok(())
    }

    /// Releases host subscriptions, removes every owned element, and emits
    /// `Destroy`. Idempotent; only the first call emits.
    pub fn destroy(&self) {
        let events = {
            let mut inner = self.inner.borrow_mut();
            if inner.phase == Phase::Destroyed {
                return;
            }
            debug!("destroying overlay compositor");
            // Dropping each subscription releases it exactly once.
            inner.subscriptions.clear();
            if let Some(host) = inner.host.take() {
                for layer in inner.layers.drain(..) {
                    host.remove_element(&layer.element);
                }
                if let Some(wrapper) = inner.wrapper.take() {
                    host.remove_element(&wrapper);
                }
            }
            inner.phase = Phase::Destroyed;
            inner.events.clone()
        };
        events.emit(&OverlayEvent::Destroy);
    }

    /// The compositor's own event channel (`Ready`, `Destroy`).
    pub fn events(&self) -> Emitter<OverlayEvent> {
        self.inner.borrow().events.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().phase == Phase::Destroyed
    }

    /// Element handles of the currently composited layers, in paint order.
    pub fn layer_elements(&self) -> Vec<H::Element> {
        self.inner
            .borrow()
            .layers
            .iter()
            .map(|layer| layer.element.clone())
            .collect()
    }

    /// Current per-source load progress.
    pub fn load_states(&self) -> Vec<LoadState> {
        let mut inner = self.inner.borrow_mut();
        inner.loader.poll().to_vec()
    }

    /// Blocks until every configured source has finished loading or
    /// failing. Demo and test convenience; steady-state operation only ever
    /// observes loads at relayout time.
    pub fn wait_for_images(&self) -> Vec<LoadState> {
        let mut inner = self.inner.borrow_mut();
        inner.loader.wait_settled().to_vec()
    }

    /// Viewport captured by the most recent layout pass.
    pub fn viewport(&self) -> Option<ViewportState> {
        self.inner.borrow().viewport
    }

    fn handle_ready(weak: &Weak<RefCell<Inner<H>>>) {
        let Some(inner_rc) = weak.upgrade() else {
            return;
        };
        {
            // First ready only; a re-initializing host does not re-arm.
            let inner = inner_rc.borrow();
            if inner.phase != Phase::AttachedPending {
                return;
            }
        }

        Self::recompute_layout(&inner_rc);

        let events = {
            let inner = inner_rc.borrow();
            inner.host.as_ref().map(TimelineHost::events)
        };
        let Some(events) = events else {
            return;
        };

        let zoom_sub = events.on({
            let weak = weak.clone();
            move |event| {
                if let HostEvent::Zoom(px_per_sec) = event {
                    Self::handle_zoom(&weak, *px_per_sec);
                }
            }
        });
        let redraw_sub = events.on({
            let weak = weak.clone();
            move |event| {
                if matches!(event, HostEvent::Redraw) {
                    Self::handle_redraw(&weak);
                }
            }
        });

        let mut inner = inner_rc.borrow_mut();
        if inner.phase == Phase::Destroyed {
            // Destroyed from inside the layout pass's ready emission; the
            // subscriptions drop (and release) here.
            return;
        }
        inner.subscriptions.push(zoom_sub);
        inner.subscriptions.push(redraw_sub);
        inner.phase = Phase::Composited;
    }

    /// Full layout pass: derive every layer's attributes from the current
    /// viewport, rebuild the elements in index order, then re-assert the
    /// host stacking overrides.
    ///
    /// The complete style list is computed before the old elements are torn
    /// down, so nothing fallible runs between teardown and rebuild and a
    /// bailed pass leaves the previous visual state intact.
    #[tracing::instrument(skip_all)]
    fn recompute_layout(inner_rc: &Rc<RefCell<Inner<H>>>) {
        let mut inner = inner_rc.borrow_mut();
        if inner.phase == Phase::Destroyed {
            return;
        }
        let (Some(host), Some(wrapper)) = (inner.host.clone(), inner.wrapper.clone()) else {
            return;
        };

        let viewport = ViewportState::resolve(
            host.duration(),
            inner.options.duration,
            host.scrollable_width(),
        );
        let total_width = viewport.total_width();

        let slots = inner.loader.poll().to_vec();
        let mut planned: Vec<(usize, LoadedImage, ElementStyle)> = Vec::new();
        for (index, slot) in slots.iter().enumerate() {
            match slot {
                LoadState::Loaded(image) => planned.push((
                    index,
                    image.clone(),
                    layer::layer_style(&inner.options, image, index, total_width),
                )),
                LoadState::Pending => {
                    debug!(index, "layer still loading; omitted from this pass");
                }
                LoadState::Failed { source, .. } => {
                    debug!(index, source = %source, "layer failed to load; omitted");
                }
            }
        }
        debug!(
            total_width,
            duration = viewport.duration,
            layers = planned.len(),
            "recomputing overlay layout"
        );

        for old in inner.layers.drain(..) {
            host.remove_element(&old.element);
        }
        for (index, image, style) in planned {
            let opacity = style.opacity;
            let element = host.create_element(&wrapper, &style);
            inner.layers.push(Layer {
                index,
                image,
                opacity,
                element,
            });
        }

        if inner.options.position == Position::Underlay {
            host.set_paint_priority(&host.mount_wrapper(), WRAPPER_PRIORITY);
            for surface in host.drawing_surfaces() {
                host.set_paint_priority(&surface, SURFACE_PRIORITY);
            }
        }
        for cursor in host.cursor_elements() {
            host.set_paint_priority(&cursor, CURSOR_PRIORITY);
        }

        inner.viewport = Some(viewport);
        let events = inner.events.clone();
        drop(inner);
        events.emit(&OverlayEvent::Ready);
    }

    /// Cheap zoom path: new width from the already-known duration, applied
    /// in place. No reload, no rebuild, no paint-priority writes.
    fn handle_zoom(weak: &Weak<RefCell<Inner<H>>>, px_per_sec: f64) {
        let Some(inner_rc) = weak.upgrade() else {
            return;
        };
        let mut inner = inner_rc.borrow_mut();
        if inner.phase != Phase::Composited {
            return;
        }
        let (Some(host), Some(viewport)) = (inner.host.clone(), inner.viewport) else {
            return;
        };

        let zoomed = viewport.zoomed(px_per_sec);
        let width = zoomed.total_width();
        debug!(px_per_sec, width, "zoom: resizing layers in place");
        for layer in &inner.layers {
            host.resize_element(&layer.element, width);
        }
        inner.viewport = Some(zoomed);
    }

    /// Redraw path: a geometry change warrants a full relayout; otherwise
    /// only the cursor priority is re-asserted, since the host may have
    /// recreated its cursor element underneath the stack.
    fn handle_redraw(weak: &Weak<RefCell<Inner<H>>>) {
        let Some(inner_rc) = weak.upgrade() else {
            return;
        };
        let (host, needs_relayout) = {
            let inner = inner_rc.borrow();
            if inner.phase != Phase::Composited {
                return;
            }
            let (Some(host), Some(cached)) = (inner.host.clone(), inner.viewport) else {
                return;
            };
            let current = ViewportState::resolve(
                host.duration(),
                inner.options.duration,
                host.scrollable_width(),
            );
            (host, current != cached)
        };

        if needs_relayout {
            Self::recompute_layout(&inner_rc);
        } else {
            for cursor in host.cursor_elements() {
                host.set_paint_priority(&cursor, CURSOR_PRIORITY);
            }
        }
    }
}

impl<H: TimelineHost> Clone for OverlayCompositor<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}
