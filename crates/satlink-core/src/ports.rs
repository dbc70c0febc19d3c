//! Seams between the console logic and whatever renders it
//!
//! The browser implements these against the DOM and Leaflet; the headless
//! module implements them in memory.

use crate::geo::{Bounds, Viewport};
use crate::overlay::{Overlay, OverlayError};
use crate::transcript::TranscriptEntry;

/// HUD readout slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HudSlot {
    Latitude,
    Longitude,
    Zoom,
}

pub trait HudView {
    /// Write a readout. Returns false when the slot does not exist.
    fn set_readout(&self, slot: HudSlot, text: &str) -> bool;
}

pub trait TranscriptView {
    /// Append an entry to the visible log and scroll it into view
    fn append_entry(&self, entry: &TranscriptEntry);
}

pub trait InputSource {
    /// Current input text, `None` if there is no input field
    fn read_input(&self) -> Option<String>;
    fn clear_input(&self);
}

/// The single busy indicator element
pub trait BusyView {
    fn mount_indicator(&self);
    fn unmount_indicator(&self);
}

/// Everything the request flows need from the page
pub trait ConsoleView: HudView + TranscriptView + InputSource + BusyView {}

impl<T: HudView + TranscriptView + InputSource + BusyView> ConsoleView for T {}

/// The map widget
pub trait MapSurface {
    /// Handle to an attached overlay; giving it back to `detach` releases it
    type Layer;

    fn attach(&self, overlay: &Overlay) -> Result<Self::Layer, OverlayError>;
    fn detach(&self, layer: Self::Layer);
    /// Animate the viewport to `bounds` with `padding` pixels around it
    fn fit_bounds(&self, bounds: Bounds, padding: [u32; 2]);
    fn viewport(&self) -> Viewport;
}
