//! An in-memory timeline host.
//!
//! Stands in for a real waveform timeline in the integration tests and the
//! demo binary: a flat element table with id handles, a configurable
//! duration and scrollable width, and a [`dispatch`](HeadlessHost::dispatch)
//! helper that emulates host behavior around each event (a redraw recreates
//! the cursor element, a zoom stretches the scrollable width).

use std::collections::HashMap;
use std::rc::Rc;
use std::{cell::RefCell, fmt};

use crate::events::Emitter;
use crate::host::{ElementStyle, HostEvent, RenderPatch, TimelineHost};

/// Handle to one element in the headless scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ElementId(u32);

/// One element's live attributes.
#[derive(Clone, Debug)]
pub struct ElementRecord {
    pub id: ElementId,
    pub parent: Option<ElementId>,
    pub style: ElementStyle,
    pub removed: bool,
}

struct HostState {
    duration: Option<f64>,
    scrollable_width: f64,
    elements: Vec<ElementRecord>,
    wrapper: ElementId,
    surfaces: Vec<ElementId>,
    cursor: ElementId,
    containers: HashMap<String, ElementId>,
    render_patches: Vec<RenderPatch>,
}

impl HostState {
    fn alloc(&mut self, parent: Option<ElementId>, style: ElementStyle) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(ElementRecord {
            id,
            parent,
            style,
            removed: false,
        });
        id
    }
}

/// Cheap-clone handle onto the in-memory host.
#[derive(Clone)]
pub struct HeadlessHost {
    state: Rc<RefCell<HostState>>,
    events: Emitter<HostEvent>,
}

impl HeadlessHost {
    /// A host with its own wave wrapper, two drawing surfaces, and a
    /// cursor, reporting the given duration and scrollable width.
    pub fn new(duration: Option<f64>, scrollable_width: f64) -> Self {
        let mut state = HostState {
            duration,
            scrollable_width,
            elements: Vec::new(),
            wrapper: ElementId(0),
            surfaces: Vec::new(),
            cursor: ElementId(0),
            containers: HashMap::new(),
            render_patches: Vec::new(),
        };
        let wrapper = state.alloc(None, ElementStyle {
            part: "wave-wrapper".to_string(),
            ..ElementStyle::default()
        });
        let surfaces = (0..2)
            .map(|_| {
                state.alloc(Some(wrapper), ElementStyle {
                    part: "wave".to_string(),
                    ..ElementStyle::default()
                })
            })
            .collect();
        let cursor = state.alloc(Some(wrapper), ElementStyle {
            part: "cursor".to_string(),
            ..ElementStyle::default()
        });
        state.wrapper = wrapper;
        state.surfaces = surfaces;
        state.cursor = cursor;
        Self {
            state: Rc::new(RefCell::new(state)),
            events: Emitter::new(),
        }
    }

    /// Emulates host-side behavior for `event`, then publishes it.
    ///
    /// A redraw recreates the cursor element (losing any priority override,
    /// as a real timeline does). A zoom stretches the scrollable width to
    /// match the new scale before subscribers observe it.
    pub fn dispatch(&self, event: HostEvent) {
        match event {
            HostEvent::Redraw => {
                let mut state = self.state.borrow_mut();
                let old = state.cursor;
                state.elements[old.0 as usize].removed = true;
                let wrapper = state.wrapper;
                let cursor = state.alloc(Some(wrapper), ElementStyle {
                    part: "cursor".to_string(),
                    ..ElementStyle::default()
                });
                state.cursor = cursor;
            }
            HostEvent::Zoom(px_per_sec) => {
                let mut state = self.state.borrow_mut();
                if let Some(duration) = state.duration {
                    state.scrollable_width = duration * px_per_sec;
                }
            }
            HostEvent::Ready => {}
        }
        self.events.emit(&event);
    }

    /// Registers a standalone container resolvable by `selector`.
    pub fn register_container(&self, selector: &str) -> ElementId {
        let mut state = self.state.borrow_mut();
        let id = state.alloc(None, ElementStyle {
            part: "container".to_string(),
            ..ElementStyle::default()
        });
        state.containers.insert(selector.to_string(), id);
        id
    }

    pub fn set_duration(&self, duration: Option<f64>) {
        self.state.borrow_mut().duration = duration;
    }

    pub fn set_scrollable_width(&self, width: f64) {
        self.state.borrow_mut().scrollable_width = width;
    }

    pub fn element(&self, id: ElementId) -> Option<ElementRecord> {
        self.state.borrow().elements.get(id.0 as usize).cloned()
    }

    /// Live (non-removed) children of `parent`, in creation order.
    pub fn children_of(&self, parent: ElementId) -> Vec<ElementRecord> {
        self.state
            .borrow()
            .elements
            .iter()
            .filter(|record| !record.removed && record.parent == Some(parent))
            .cloned()
            .collect()
    }

    pub fn live_elements(&self) -> Vec<ElementRecord> {
        self.state
            .borrow()
            .elements
            .iter()
            .filter(|record| !record.removed)
            .cloned()
            .collect()
    }

    /// Total number of elements ever created, removed ones included.
    pub fn element_count(&self) -> usize {
        self.state.borrow().elements.len()
    }

    /// Every render-option override the compositor has applied, in order.
    pub fn render_patches(&self) -> Vec<RenderPatch> {
        self.state.borrow().render_patches.clone()
    }

    pub fn wrapper_id(&self) -> ElementId {
        self.state.borrow().wrapper
    }

    pub fn cursor_id(&self) -> ElementId {
        self.state.borrow().cursor
    }

    pub fn surface_ids(&self) -> Vec<ElementId> {
        self.state.borrow().surfaces.clone()
    }
}

impl fmt::Debug for HeadlessHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("HeadlessHost")
            .field("duration", &state.duration)
            .field("scrollable_width", &state.scrollable_width)
            .field("elements", &state.elements.len())
            .finish()
    }
}

impl TimelineHost for HeadlessHost {
    type Element = ElementId;

    fn events(&self) -> Emitter<HostEvent> {
        self.events.clone()
    }

    fn duration(&self) -> Option<f64> {
        self.state.borrow().duration
    }

    fn scrollable_width(&self) -> f64 {
        self.state.borrow().scrollable_width
    }

    fn mount_wrapper(&self) -> ElementId {
        self.state.borrow().wrapper
    }

    fn resolve_container(&self, selector: &str) -> Option<ElementId> {
        let state = self.state.borrow();
        state
            .containers
            .get(selector)
            .copied()
            .filter(|id| !state.elements[id.0 as usize].removed)
    }

    fn set_render_options(&self, patch: &RenderPatch) {
        self.state.borrow_mut().render_patches.push(patch.clone());
    }

    fn create_element(&self, parent: &ElementId, style: &ElementStyle) -> ElementId {
        self.state.borrow_mut().alloc(Some(*parent), style.clone())
    }

    fn resize_element(&self, element: &ElementId, width_px: f64) {
        let mut state = self.state.borrow_mut();
        let record = &mut state.elements[element.0 as usize];
        record.style.width_px = Some(width_px);
        if record.style.background_image.is_some() {
            record.style.background_width_px = Some(width_px);
        }
    }

    fn remove_element(&self, element: &ElementId) {
        let mut state = self.state.borrow_mut();
        let mut doomed = vec![*element];
        while let Some(id) = doomed.pop() {
            state.elements[id.0 as usize].removed = true;
            let children: Vec<ElementId> = state
                .elements
                .iter()
                .filter(|record| !record.removed && record.parent == Some(id))
                .map(|record| record.id)
                .collect();
            doomed.extend(children);
        }
    }

    fn set_paint_priority(&self, element: &ElementId, priority: i32) {
        let mut state = self.state.borrow_mut();
        state.elements[element.0 as usize].style.paint_priority = Some(priority);
    }

    fn drawing_surfaces(&self) -> Vec<ElementId> {
        let state = self.state.borrow();
        state
            .surfaces
            .iter()
            .copied()
            .filter(|id| !state.elements[id.0 as usize].removed)
            .collect()
    }

    fn cursor_elements(&self) -> Vec<ElementId> {
        let state = self.state.borrow();
        let cursor = state.cursor;
        if state.elements[cursor.0 as usize].removed {
            Vec::new()
        } else {
            vec![cursor]
        }
    }
}
