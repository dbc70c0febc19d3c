//! Request flows: sending chat messages and scanning the viewport
//!
//! A [`Console`] owns everything one page needs (backend, view, map,
//! transcript, overlay slot and busy indicator), so several independent
//! consoles can coexist.

use std::cell::{Ref, RefCell};
use tracing::{error, info, warn};

use crate::api::{Backend, ChatRequest};
use crate::busy::BusyTracker;
use crate::config::ConsoleConfig;
use crate::overlay::{DrawOutcome, OverlayError, OverlayRenderer};
use crate::ports::{ConsoleView, MapSurface};
use crate::transcript::{ChatMessage, Sender, Transcript, TranscriptEntry};
use crate::viewport::ViewportController;

/// How a flow invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Nothing to do (empty input)
    Skipped,
    Completed,
    /// An error message was appended to the transcript
    Failed,
}

pub struct Console<B, V, M: MapSurface> {
    config: ConsoleConfig,
    backend: B,
    view: V,
    map: M,
    controller: ViewportController,
    overlay: OverlayRenderer<M::Layer>,
    transcript: RefCell<Transcript>,
    busy: BusyTracker,
}

impl<B, V, M> Console<B, V, M>
where
    B: Backend,
    V: ConsoleView,
    M: MapSurface,
{
    pub fn new(config: ConsoleConfig, backend: B, view: V, map: M) -> Self {
        let controller = ViewportController::new(config.map.clone());
        let overlay = OverlayRenderer::new(config.overlay.clone(), config.popup.clone());
        Self {
            config,
            backend,
            view,
            map,
            controller,
            overlay,
            transcript: RefCell::new(Transcript::new()),
            busy: BusyTracker::new(),
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    pub fn transcript(&self) -> Ref<'_, Transcript> {
        self.transcript.borrow()
    }

    pub fn busy(&self) -> &BusyTracker {
        &self.busy
    }

    pub fn overlay_live(&self) -> bool {
        self.overlay.is_live()
    }

    /// Record a message and show it
    pub fn append_message(&self, text: &str, sender: Sender) {
        let message = ChatMessage::new(text, sender);
        let entry = TranscriptEntry::render(&message);
        self.transcript.borrow_mut().push(message);
        self.view.append_entry(&entry);
    }

    /// Pan/zoom hook: mirror the map into the HUD
    pub fn on_viewport_change(&self) -> usize {
        let viewport = self.map.viewport();
        self.controller.refresh_hud(&self.view, &viewport)
    }

    /// Replace the live overlay with one built from a GeoJSON payload
    pub fn draw_overlay(&self, payload: &str) -> Result<DrawOutcome, OverlayError> {
        self.overlay.draw(&self.map, payload)
    }

    /// Send the typed message to the chat endpoint
    pub async fn send_message(&self) -> FlowOutcome {
        let Some(raw) = self.view.read_input() else {
            return FlowOutcome::Skipped;
        };
        let message = raw.trim();
        if message.is_empty() {
            return FlowOutcome::Skipped;
        }
        let request = ChatRequest {
            message: message.to_string(),
        };

        self.append_message(&request.message, Sender::User);
        self.view.clear_input();
        let busy = self.busy.acquire(&self.view);

        match self.backend.chat(&request).await {
            Ok(response) => {
                busy.release();
                self.append_message(&response.text, Sender::System);

                let Some(payload) = response.overlay_payload() else {
                    return FlowOutcome::Completed;
                };
                match self.draw_overlay(payload) {
                    Ok(outcome) => {
                        info!(shapes = outcome.shapes, "Chat response rendered on map");
                        FlowOutcome::Completed
                    }
                    Err(e) => {
                        error!(error = %e, "SAT-LINK ERROR: overlay rendering failed");
                        self.append_message(&self.config.messages.chat_error, Sender::System);
                        FlowOutcome::Failed
                    }
                }
            }
            Err(e) => {
                busy.release();
                error!(error = %e, "SAT-LINK ERROR: chat request failed");
                self.append_message(&self.config.messages.chat_error, Sender::System);
                FlowOutcome::Failed
            }
        }
    }

    /// Ask the vision backend to analyse the visible region
    pub async fn scan_viewport(&self) -> FlowOutcome {
        // Snapshot before anything awaits; later pans must not leak in
        let viewport = self.map.viewport();
        let request = self.controller.scan_request(&viewport);
        info!(
            west = request.west,
            south = request.south,
            east = request.east,
            north = request.north,
            zoom = request.zoom,
            "Starting viewport scan"
        );

        self.append_message(&self.config.messages.scan_started, Sender::User);
        let busy = self.busy.acquire(&self.view);

        match self.backend.scan(&request).await {
            Ok(response) => {
                busy.release();
                let text = response
                    .text
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| self.config.messages.scan_empty.clone());
                self.append_message(&text, Sender::VisionSystem);
                FlowOutcome::Completed
            }
            Err(e) => {
                busy.release();
                warn!(error = %e, "SAT-LINK ERROR: scan request failed");
                self.append_message(&self.config.messages.scan_error, Sender::System);
                FlowOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ChatResponse, ScanRequest, ScanResponse};
    use crate::geo::{Bounds, LatLng, Viewport};
    use crate::headless::{HeadlessMap, HeadlessView};
    use crate::overlay::Shape;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    const TANK: &str = r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[9.19,45.4642]},"properties":{"id":1,"label":"Tank"}}]}"#;

    /// Backend replaying canned responses and recording requests
    #[derive(Default)]
    struct ScriptedBackend {
        chat_replies: RefCell<VecDeque<Result<ChatResponse, ApiError>>>,
        scan_replies: RefCell<VecDeque<Result<ScanResponse, ApiError>>>,
        chats: RefCell<Vec<ChatRequest>>,
        scans: RefCell<Vec<ScanRequest>>,
        /// Viewport the user pans to while a scan is in flight
        pan_during_scan: Option<(HeadlessMap, Viewport)>,
    }

    impl ScriptedBackend {
        fn chat_reply(self, reply: Result<ChatResponse, ApiError>) -> Self {
            self.chat_replies.borrow_mut().push_back(reply);
            self
        }

        fn scan_reply(self, reply: Result<ScanResponse, ApiError>) -> Self {
            self.scan_replies.borrow_mut().push_back(reply);
            self
        }
    }

    impl Backend for ScriptedBackend {
        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
            self.chats.borrow_mut().push(request.clone());
            tokio::task::yield_now().await;
            self.chat_replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(ApiError::Transport("no reply scripted".to_string())))
        }

        async fn scan(&self, request: &ScanRequest) -> Result<ScanResponse, ApiError> {
            self.scans.borrow_mut().push(request.clone());
            if let Some((map, viewport)) = &self.pan_during_scan {
                map.move_to(*viewport);
            }
            tokio::task::yield_now().await;
            self.scan_replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(ApiError::Transport("no reply scripted".to_string())))
        }
    }

    fn console(
        backend: ScriptedBackend,
    ) -> (Console<ScriptedBackend, HeadlessView, HeadlessMap>, HeadlessView, HeadlessMap) {
        let view = HeadlessView::new();
        let map = HeadlessMap::default();
        let console = Console::new(ConsoleConfig::default(), backend, view.clone(), map.clone());
        (console, view, map)
    }

    fn reply(text: &str, geojson: Option<&str>) -> Result<ChatResponse, ApiError> {
        Ok(ChatResponse {
            text: text.to_string(),
            geojson: geojson.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_send_message_trims_and_posts() {
        let (console, view, _map) = console(ScriptedBackend::default().chat_reply(reply("Roger", None)));
        view.set_input("   show depots near Milan  ");

        assert_eq!(console.send_message().await, FlowOutcome::Completed);

        let chats = console.backend().chats.borrow().clone();
        assert_eq!(chats, vec![ChatRequest { message: "show depots near Milan".to_string() }]);
        assert_eq!(view.input().as_deref(), Some(""));

        let transcript = console.transcript();
        assert_eq!(transcript.count_from(Sender::User), 1);
        assert_eq!(transcript.messages()[0].text, "show depots near Milan");
        assert_eq!(transcript.messages()[1], ChatMessage::new("Roger", Sender::System));
        assert_eq!(view.entries().len(), 2);
        assert_eq!(view.scrolled_to(), Some(1));
    }

    #[tokio::test]
    async fn test_blank_input_is_a_no_op() {
        let (console, view, _map) = console(ScriptedBackend::default());

        for input in ["", "   ", "\n\t"] {
            view.set_input(input);
            assert_eq!(console.send_message().await, FlowOutcome::Skipped);
        }

        assert!(console.backend().chats.borrow().is_empty());
        assert!(console.transcript().is_empty());
        assert_eq!(view.mounts(), 0);
        assert_eq!(view.unmounts(), 0);
    }

    #[tokio::test]
    async fn test_missing_input_field_is_a_no_op() {
        let view = HeadlessView::without_input();
        let console = Console::new(
            ConsoleConfig::default(),
            ScriptedBackend::default(),
            view.clone(),
            HeadlessMap::default(),
        );
        assert_eq!(console.send_message().await, FlowOutcome::Skipped);
        assert_eq!(view.mounts(), 0);
    }

    #[tokio::test]
    async fn test_empty_collection_leaves_viewport() {
        let (console, view, map) = console(
            ScriptedBackend::default()
                .chat_reply(reply("Clear", Some(r#"{"type":"FeatureCollection","features":[]}"#))),
        );
        let before = map.current_viewport();
        view.set_input("anything?");

        assert_eq!(console.send_message().await, FlowOutcome::Completed);

        assert_eq!(console.transcript().count_from(Sender::System), 1);
        assert_eq!(console.transcript().last().unwrap().text, "Clear");
        assert_eq!(map.current_viewport(), before);
        assert!(map.fits().is_empty());
    }

    #[tokio::test]
    async fn test_point_result_draws_marker_and_fits() {
        let (console, view, map) =
            console(ScriptedBackend::default().chat_reply(reply("Target found", Some(TANK))));
        view.set_input("where is the tank");

        assert_eq!(console.send_message().await, FlowOutcome::Completed);

        let overlays = map.live_overlays();
        assert_eq!(overlays.len(), 1);
        assert!(matches!(overlays[0].features[0].shapes[0], Shape::CircleMarker { .. }));
        let popup = overlays[0].popups().next().unwrap();
        assert_eq!(popup.row("label"), Some("Tank"));
        assert_eq!(popup.row("id"), None);

        let fits = map.fits();
        assert_eq!(fits.len(), 1);
        assert!(fits[0].0.contains(LatLng::new(45.4642, 9.19)));
        assert_eq!(fits[0].1, [100, 100]);
        assert_eq!(map.current_viewport().center, LatLng::new(45.4642, 9.19));
    }

    #[tokio::test]
    async fn test_consecutive_results_keep_one_overlay() {
        let line = r#"{"type":"Feature","geometry":{"type":"LineString","coordinates":[[8,44],[8.5,44.5]]},"properties":{"route":"B"}}"#;
        let (console, view, map) = console(
            ScriptedBackend::default()
                .chat_reply(reply("A", Some(TANK)))
                .chat_reply(reply("B", Some(line))),
        );

        view.set_input("first");
        console.send_message().await;
        view.set_input("second");
        console.send_message().await;

        let overlays = map.live_overlays();
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].popups().next().unwrap().row("route"), Some("B"));
        assert!(overlays[0].popups().all(|p| p.row("label").is_none()));
        assert!(console.overlay_live());
    }

    #[tokio::test]
    async fn test_transport_failure_reports_error() {
        let (console, view, map) = console(
            ScriptedBackend::default()
                .chat_reply(reply("A", Some(TANK)))
                .chat_reply(Err(ApiError::Transport("connection refused".to_string()))),
        );
        view.set_input("first");
        console.send_message().await;
        let overlay_before = map.live_overlays();

        view.set_input("second");
        assert_eq!(console.send_message().await, FlowOutcome::Failed);

        assert!(!view.indicator_mounted());
        assert_eq!(view.mounts(), view.unmounts());
        let last = console.transcript().last().cloned().unwrap();
        assert_eq!(last.sender, Sender::System);
        assert_eq!(last.text, ConsoleConfig::default().messages.chat_error);
        assert_eq!(console.transcript().count_from(Sender::System), 2);
        assert_eq!(map.live_overlays(), overlay_before);
    }

    #[tokio::test]
    async fn test_status_and_decode_failures_collapse() {
        let (console, view, _map) = console(
            ScriptedBackend::default()
                .chat_reply(Err(ApiError::Status(500)))
                .chat_reply(Err(ApiError::Decode("expected value".to_string()))),
        );
        for _ in 0..2 {
            view.set_input("status?");
            assert_eq!(console.send_message().await, FlowOutcome::Failed);
        }
        let errors = console
            .transcript()
            .messages()
            .iter()
            .filter(|m| m.text == console.config().messages.chat_error)
            .count();
        assert_eq!(errors, 2);
        assert_eq!(view.mounts(), 2);
        assert_eq!(view.unmounts(), 2);
    }

    #[tokio::test]
    async fn test_bad_geojson_reports_error_after_text() {
        let (console, view, map) =
            console(ScriptedBackend::default().chat_reply(reply("Here you go", Some("{broken"))));
        view.set_input("go");

        assert_eq!(console.send_message().await, FlowOutcome::Failed);

        let texts: Vec<String> = console.transcript().messages().iter().map(|m| m.text.clone()).collect();
        assert_eq!(
            texts,
            vec!["go".to_string(), "Here you go".to_string(), console.config().messages.chat_error.clone()]
        );
        assert!(map.live_overlays().is_empty());
        assert_eq!(view.unmounts(), 1);
    }

    #[tokio::test]
    async fn test_rejected_overlay_reports_error_after_text() {
        let (console, view, map) = console(
            ScriptedBackend::default()
                .chat_reply(reply("A", Some(TANK)))
                .chat_reply(reply("Target found", Some(TANK))),
        );
        view.set_input("first");
        assert_eq!(console.send_message().await, FlowOutcome::Completed);

        map.reject_attach(true);
        view.set_input("second");
        assert_eq!(console.send_message().await, FlowOutcome::Failed);

        let messages = console.transcript().messages().to_vec();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[3], ChatMessage::new("Target found", Sender::System));
        assert_eq!(
            messages[4],
            ChatMessage::new(console.config().messages.chat_error.clone(), Sender::System)
        );
        assert!(!console.overlay_live());
        assert!(map.live_overlays().is_empty());
        assert_eq!(map.fits().len(), 1);
        assert_eq!(view.mounts(), 2);
        assert_eq!(view.unmounts(), 2);
        assert!(!view.indicator_mounted());
    }

    #[tokio::test]
    async fn test_scan_uses_snapshot_and_vision_sender() {
        let map = HeadlessMap::default();
        let start = map.current_viewport();
        let elsewhere = Viewport {
            center: LatLng::new(41.9, 12.5),
            zoom: 10.0,
            bounds: Bounds::new(12.0, 41.5, 13.0, 42.3),
        };
        let backend = ScriptedBackend {
            pan_during_scan: Some((map.clone(), elsewhere)),
            ..ScriptedBackend::default()
        }
        .scan_reply(Ok(ScanResponse {
            text: Some("Two vehicles near the ring road".to_string()),
        }));
        let view = HeadlessView::new();
        let console = Console::new(ConsoleConfig::default(), backend, view.clone(), map.clone());

        assert_eq!(console.scan_viewport().await, FlowOutcome::Completed);

        let scans = console.backend().scans.borrow().clone();
        assert_eq!(scans, vec![ScanRequest::from_viewport(&start)]);
        assert_eq!(map.current_viewport(), elsewhere);

        let messages = console.transcript().messages().to_vec();
        assert_eq!(messages[0], ChatMessage::new("STARTING OPTIC SCANNING...", Sender::User));
        assert_eq!(
            messages[1],
            ChatMessage::new("Two vehicles near the ring road", Sender::VisionSystem)
        );
        assert_eq!(view.mounts(), 1);
        assert_eq!(view.unmounts(), 1);
    }

    #[tokio::test]
    async fn test_scan_without_text_uses_default() {
        let (console, _view, _map) = console(
            ScriptedBackend::default()
                .scan_reply(Ok(ScanResponse { text: None }))
                .scan_reply(Ok(ScanResponse { text: Some(String::new()) })),
        );
        console.scan_viewport().await;
        console.scan_viewport().await;

        let vision: Vec<String> = console
            .transcript()
            .messages()
            .iter()
            .filter(|m| m.sender == Sender::VisionSystem)
            .map(|m| m.text.clone())
            .collect();
        let expected = console.config().messages.scan_empty.clone();
        assert_eq!(vision, vec![expected.clone(), expected]);
    }

    #[tokio::test]
    async fn test_scan_failure_reports_system_error() {
        let (console, view, map) =
            console(ScriptedBackend::default().scan_reply(Err(ApiError::Status(500))));

        assert_eq!(console.scan_viewport().await, FlowOutcome::Failed);

        let last = console.transcript().last().cloned().unwrap();
        assert_eq!(last, ChatMessage::new("SCAN_ERROR: Sensors offline.", Sender::System));
        assert!(!view.indicator_mounted());
        assert!(map.live_overlays().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_flows_share_indicator() {
        let (console, view, _map) = console(
            ScriptedBackend::default()
                .chat_reply(reply("ok", None))
                .scan_reply(Ok(ScanResponse { text: Some("seen".to_string()) })),
        );
        view.set_input("status");

        let (chat, scan) = tokio::join!(console.send_message(), console.scan_viewport());

        assert_eq!(chat, FlowOutcome::Completed);
        assert_eq!(scan, FlowOutcome::Completed);
        assert_eq!(view.mounts(), 1);
        assert_eq!(view.unmounts(), 1);
        assert_eq!(console.busy().acquired(), 2);
        assert_eq!(console.busy().released(), 2);
        assert!(!view.indicator_mounted());
    }

    #[test]
    fn test_viewport_change_updates_hud() {
        let (console, view, map) = console(ScriptedBackend::default());
        map.move_to(Viewport {
            center: LatLng::new(40.85179, 14.26812),
            zoom: 12.0,
            bounds: Bounds::new(14.2, 40.8, 14.3, 40.9),
        });

        assert_eq!(console.on_viewport_change(), 3);
        assert_eq!(view.readout(crate::ports::HudSlot::Latitude).as_deref(), Some("40.8518"));
        assert_eq!(view.readout(crate::ports::HudSlot::Longitude).as_deref(), Some("14.2681"));
        assert_eq!(view.readout(crate::ports::HudSlot::Zoom).as_deref(), Some("12"));
    }
}
