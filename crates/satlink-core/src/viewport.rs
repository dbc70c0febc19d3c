//! Map viewport controller
//!
//! Mirrors the map's center and zoom into the HUD and snapshots the visible
//! region for scan requests.

use std::cell::Cell;
use tracing::debug;

use crate::api::ScanRequest;
use crate::config::MapConfig;
use crate::geo::Viewport;
use crate::ports::{HudSlot, HudView};

pub struct ViewportController {
    config: MapConfig,
    last: Cell<Option<Viewport>>,
}

impl ViewportController {
    pub fn new(config: MapConfig) -> Self {
        Self {
            config,
            last: Cell::new(None),
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Write center and zoom into the HUD
    ///
    /// Missing slots are skipped. Returns the number of slots written.
    pub fn refresh_hud<H: HudView>(&self, hud: &H, viewport: &Viewport) -> usize {
        let (lat, lng) = viewport.center_readout();
        let zoom = viewport.zoom_readout();

        let mut written = 0;
        for (slot, text) in [
            (HudSlot::Latitude, &lat),
            (HudSlot::Longitude, &lng),
            (HudSlot::Zoom, &zoom),
        ] {
            if hud.set_readout(slot, text) {
                written += 1;
            } else {
                debug!(slot = ?slot, "HUD slot missing, skipping");
            }
        }

        self.last.set(Some(*viewport));
        written
    }

    /// Last viewport pushed to the HUD
    pub fn last_viewport(&self) -> Option<Viewport> {
        self.last.get()
    }

    /// Scan request for the region visible right now
    pub fn scan_request(&self, viewport: &Viewport) -> ScanRequest {
        ScanRequest::from_viewport(viewport)
    }
}
