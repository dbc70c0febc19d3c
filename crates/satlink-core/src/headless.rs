//! In-memory view and map
//!
//! Both types are cheap handles over shared state: clone one, hand the clone
//! to a [`Console`](crate::Console), and inspect what was rendered through the
//! other.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use crate::geo::{Bounds, LatLng, Viewport};
use crate::overlay::{Overlay, OverlayError};
use crate::ports::{BusyView, HudSlot, HudView, InputSource, MapSurface, TranscriptView};
use crate::transcript::TranscriptEntry;

#[derive(Debug, Default)]
struct ViewState {
    input: Option<String>,
    readouts: HashMap<HudSlot, String>,
    missing_slots: HashSet<HudSlot>,
    entries: Vec<TranscriptEntry>,
    /// Index of the entry scrolled into view
    scrolled_to: Option<usize>,
    indicator: bool,
    mounts: u32,
    unmounts: u32,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessView {
    state: Rc<RefCell<ViewState>>,
}

impl HeadlessView {
    /// View with an empty input field and every HUD slot present
    pub fn new() -> Self {
        let view = Self::default();
        view.state.borrow_mut().input = Some(String::new());
        view
    }

    /// View whose HUD lacks some slots
    pub fn with_missing_slots(slots: &[HudSlot]) -> Self {
        let view = Self::new();
        view.state.borrow_mut().missing_slots = slots.iter().copied().collect();
        view
    }

    /// View without an input field
    pub fn without_input() -> Self {
        Self::default()
    }

    /// Simulate typing into the input field
    pub fn set_input(&self, text: &str) {
        self.state.borrow_mut().input = Some(text.to_string());
    }

    pub fn input(&self) -> Option<String> {
        self.state.borrow().input.clone()
    }

    pub fn readout(&self, slot: HudSlot) -> Option<String> {
        self.state.borrow().readouts.get(&slot).cloned()
    }

    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.state.borrow().entries.clone()
    }

    pub fn scrolled_to(&self) -> Option<usize> {
        self.state.borrow().scrolled_to
    }

    pub fn indicator_mounted(&self) -> bool {
        self.state.borrow().indicator
    }

    pub fn mounts(&self) -> u32 {
        self.state.borrow().mounts
    }

    pub fn unmounts(&self) -> u32 {
        self.state.borrow().unmounts
    }
}

impl HudView for HeadlessView {
    fn set_readout(&self, slot: HudSlot, text: &str) -> bool {
        let mut state = self.state.borrow_mut();
        if state.missing_slots.contains(&slot) {
            return false;
        }
        state.readouts.insert(slot, text.to_string());
        true
    }
}

impl TranscriptView for HeadlessView {
    fn append_entry(&self, entry: &TranscriptEntry) {
        let mut state = self.state.borrow_mut();
        state.entries.push(entry.clone());
        state.scrolled_to = Some(state.entries.len() - 1);
    }
}

impl InputSource for HeadlessView {
    fn read_input(&self) -> Option<String> {
        self.input()
    }

    fn clear_input(&self) {
        if let Some(input) = self.state.borrow_mut().input.as_mut() {
            input.clear();
        }
    }
}

impl BusyView for HeadlessView {
    fn mount_indicator(&self) {
        let mut state = self.state.borrow_mut();
        state.indicator = true;
        state.mounts += 1;
    }

    fn unmount_indicator(&self) {
        let mut state = self.state.borrow_mut();
        state.indicator = false;
        state.unmounts += 1;
    }
}

/// Handle of an overlay attached to a [`HeadlessMap`]
#[derive(Debug)]
pub struct HeadlessLayer(u64);

#[derive(Debug)]
struct MapState {
    viewport: Viewport,
    layers: BTreeMap<u64, Overlay>,
    next_layer: u64,
    detached: usize,
    fits: Vec<(Bounds, [u32; 2])>,
    reject_attach: bool,
}

#[derive(Debug, Clone)]
pub struct HeadlessMap {
    state: Rc<RefCell<MapState>>,
}

impl Default for HeadlessMap {
    /// Milan at zoom 13, roughly what a 1280×800 page shows
    fn default() -> Self {
        Self::new(Viewport {
            center: LatLng::new(45.4642, 9.19),
            zoom: 13.0,
            bounds: Bounds::new(9.135, 45.4403, 9.245, 45.4881),
        })
    }
}

impl HeadlessMap {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            state: Rc::new(RefCell::new(MapState {
                viewport,
                layers: BTreeMap::new(),
                next_layer: 0,
                detached: 0,
                fits: Vec::new(),
                reject_attach: false,
            })),
        }
    }

    /// Simulate a user pan/zoom gesture
    pub fn move_to(&self, viewport: Viewport) {
        self.state.borrow_mut().viewport = viewport;
    }

    /// Make subsequent attaches fail
    pub fn reject_attach(&self, reject: bool) {
        self.state.borrow_mut().reject_attach = reject;
    }

    pub fn current_viewport(&self) -> Viewport {
        self.state.borrow().viewport
    }

    /// Overlays currently attached, oldest first
    pub fn live_overlays(&self) -> Vec<Overlay> {
        self.state.borrow().layers.values().cloned().collect()
    }

    pub fn detached_count(&self) -> usize {
        self.state.borrow().detached
    }

    pub fn fits(&self) -> Vec<(Bounds, [u32; 2])> {
        self.state.borrow().fits.clone()
    }
}

impl MapSurface for HeadlessMap {
    type Layer = HeadlessLayer;

    fn attach(&self, overlay: &Overlay) -> Result<HeadlessLayer, OverlayError> {
        let mut state = self.state.borrow_mut();
        if state.reject_attach {
            return Err(OverlayError::Attach("headless map rejects overlays".to_string()));
        }
        let id = state.next_layer;
        state.next_layer += 1;
        state.layers.insert(id, overlay.clone());
        Ok(HeadlessLayer(id))
    }

    fn detach(&self, layer: HeadlessLayer) {
        let mut state = self.state.borrow_mut();
        if state.layers.remove(&layer.0).is_some() {
            state.detached += 1;
        }
    }

    fn fit_bounds(&self, bounds: Bounds, padding: [u32; 2]) {
        let mut state = self.state.borrow_mut();
        state.fits.push((bounds, padding));
        state.viewport.bounds = bounds;
        state.viewport.center = bounds.center();
    }

    fn viewport(&self) -> Viewport {
        self.current_viewport()
    }
}
