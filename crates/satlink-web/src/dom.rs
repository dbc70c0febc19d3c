//! Console view backed by the page's DOM

use satlink_core::{BusyView, HudSlot, HudView, InputSource, TranscriptEntry, TranscriptView};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlInputElement};

pub const INPUT_ID: &str = "user-input";
pub const HISTORY_ID: &str = "chat-history";
pub const LOADER_ID: &str = "active-chat-loader";
const LOADER_CLASS: &str = "chat-loader-container";
const LOADER_HTML: &str = r#"<div class="loader"></div>"#;

/// Element id for a HUD slot
pub fn slot_id(slot: HudSlot) -> &'static str {
    match slot {
        HudSlot::Latitude => "lat-disp",
        HudSlot::Longitude => "lng-disp",
        HudSlot::Zoom => "zoom-disp",
    }
}

/// Elements are looked up on every call; the page may not have all of them
pub struct DomView {
    document: Document,
}

impl DomView {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn element(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn input(&self) -> Option<HtmlInputElement> {
        self.element(INPUT_ID)?.dyn_into::<HtmlInputElement>().ok()
    }
}

impl HudView for DomView {
    fn set_readout(&self, slot: HudSlot, text: &str) -> bool {
        match self.element(slot_id(slot)) {
            Some(el) => {
                el.set_text_content(Some(text));
                true
            }
            None => false,
        }
    }
}

impl TranscriptView for DomView {
    fn append_entry(&self, entry: &TranscriptEntry) {
        let Some(history) = self.element(HISTORY_ID) else {
            warn!(id = HISTORY_ID, "Chat history element missing");
            return;
        };
        let div = match self.document.create_element("div") {
            Ok(div) => div,
            Err(e) => {
                warn!(error = ?e, "Failed to create message element");
                return;
            }
        };
        div.set_class_name(&entry.class_attr());
        div.set_inner_html(entry.body.as_str());
        if let Err(e) = history.append_child(&div) {
            warn!(error = ?e, "Failed to append message");
            return;
        }
        history.set_scroll_top(history.scroll_height());
    }
}

impl InputSource for DomView {
    fn read_input(&self) -> Option<String> {
        self.input().map(|input| input.value())
    }

    fn clear_input(&self) {
        if let Some(input) = self.input() {
            input.set_value("");
        }
    }
}

impl BusyView for DomView {
    fn mount_indicator(&self) {
        let Some(history) = self.element(HISTORY_ID) else {
            return;
        };
        if self.element(LOADER_ID).is_some() {
            return;
        }
        match self.document.create_element("div") {
            Ok(loader) => {
                loader.set_id(LOADER_ID);
                loader.set_class_name(LOADER_CLASS);
                loader.set_inner_html(LOADER_HTML);
                if history.append_child(&loader).is_ok() {
                    history.set_scroll_top(history.scroll_height());
                    debug!("Busy indicator mounted");
                }
            }
            Err(e) => warn!(error = ?e, "Failed to create busy indicator"),
        }
    }

    fn unmount_indicator(&self) {
        if let Some(loader) = self.element(LOADER_ID) {
            loader.remove();
            debug!("Busy indicator removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_ids() {
        assert_eq!(slot_id(HudSlot::Latitude), "lat-disp");
        assert_eq!(slot_id(HudSlot::Longitude), "lng-disp");
        assert_eq!(slot_id(HudSlot::Zoom), "zoom-disp");
    }
}
