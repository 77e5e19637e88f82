use std::path::PathBuf;

use futures::channel::mpsc;

use crate::capture::{
    self, CaptureCoordinator, CaptureResult, CaptureWorker, SoftwareSurface, SurfaceCapturer,
};
use crate::history::{HistoryChange, HistorySubscription};
use crate::input::InputHandler;
use crate::panels::{central_panel, tools_panel};
use crate::persistence;
use crate::renderer::Renderer;
use crate::session::CanvasSession;
use crate::settings::CanvasSettings;
use crate::util::time;

/// Name of the drawing file inside the export directory
pub const DRAWING_FILE: &str = "drawing.json";

/// How long status messages stay visible, in seconds
const STATUS_TIMEOUT: f64 = 4.0;

/// The drawing application: a canvas, a brush panel and image export
pub struct PaintApp {
    settings: CanvasSettings,
    session: CanvasSession,
    renderer: Renderer,
    input: InputHandler,
    history_changes: HistorySubscription,
    last_change: Option<HistoryChange>,

    surface: SoftwareSurface,
    capture: CaptureCoordinator,
    capture_results: mpsc::UnboundedReceiver<CaptureResult>,
    capture_results_tx: mpsc::UnboundedSender<CaptureResult>,
    presented: Option<(u64, f32)>,
    screen_rect: Option<egui::Rect>,

    status: Option<(String, f64)>,
}

impl PaintApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings: CanvasSettings = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        Self::with_settings(settings)
    }

    pub fn with_settings(settings: CanvasSettings) -> Self {
        let session = CanvasSession::new(&settings);
        let history_changes = session.subscribe();

        let surface = SoftwareSurface::new();
        surface.set_tolerance(settings.flatten_tolerance);
        let (capture, worker) = capture::capture_pipeline(surface.clone());
        spawn_capture_worker(worker);
        let (capture_results_tx, capture_results) = mpsc::unbounded();

        Self {
            renderer: Renderer::new(settings.flatten_tolerance),
            settings,
            session,
            input: InputHandler::new(),
            history_changes,
            last_change: None,
            surface,
            capture,
            capture_results,
            capture_results_tx,
            presented: None,
            screen_rect: None,
            status: None,
        }
    }

    pub fn settings(&self) -> &CanvasSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut CanvasSettings {
        &mut self.settings
    }

    pub fn session(&self) -> &CanvasSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CanvasSession {
        &mut self.session
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn input_mut(&mut self) -> &mut InputHandler {
        &mut self.input
    }

    pub fn capture(&self) -> &CaptureCoordinator {
        &self.capture
    }

    /// Most recent history notification
    pub fn last_change(&self) -> Option<HistoryChange> {
        self.last_change
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_ref().map(|(message, _)| message.as_str())
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), time::current_time_secs()));
    }

    /// Called at the start of every frame. A changed window size means the canvas
    /// is about to be laid out again, so captures hold off until [`Self::present`]
    /// reports the new size.
    pub fn begin_frame(&mut self, screen_rect: egui::Rect) {
        if self.screen_rect != Some(screen_rect) {
            self.screen_rect = Some(screen_rect);
            self.capture.layout().begin_layout();
        }
    }

    /// Keep the capture surface in sync with what is on screen
    pub fn present(&mut self, size_px: [u32; 2], pixels_per_point: f32) {
        let revision = self.session.history().revision();
        if self.presented != Some((revision, pixels_per_point)) {
            self.surface.present(self.session.export_document(), pixels_per_point);
            self.presented = Some((revision, pixels_per_point));
        }
        self.capture.layout().complete_layout(size_px);
    }

    /// Ask for an image of the canvas; it is saved when the capture arrives
    pub fn request_export(&mut self, ctx: &egui::Context) {
        let results = self.capture_results_tx.clone();
        let ctx = ctx.clone();
        self.capture.request_capture(self.settings.capture_format, move |result| {
            let _ = results.unbounded_send(result);
            ctx.request_repaint();
        });
        self.set_status("Exporting…");
    }

    pub fn drawing_path(&self) -> PathBuf {
        self.settings.export_dir.join(DRAWING_FILE)
    }

    pub fn save_drawing(&mut self) {
        let path = self.drawing_path();
        match persistence::save_document(&self.session.export_document(), &path) {
            Ok(()) => self.set_status(format!("Saved drawing to {}", path.display())),
            Err(err) => {
                log::error!("Failed to save drawing: {}", err);
                self.set_status(format!("Could not save drawing: {}", err));
            }
        }
    }

    pub fn open_drawing(&mut self) {
        let path = self.drawing_path();
        match persistence::load_document(&path) {
            Ok(document) => {
                self.settings.background = document.background();
                self.session.import_document(document);
                self.set_status(format!("Opened {}", path.display()));
            }
            Err(err) => {
                log::error!("Failed to open drawing: {}", err);
                self.set_status(format!("Could not open drawing: {}", err));
            }
        }
    }

    fn poll_background_work(&mut self) {
        while let Some(change) = self.history_changes.try_next() {
            self.last_change = Some(change);
        }

        while let Ok(Some(result)) = self.capture_results.try_next() {
            match result {
                Ok(image) => match persistence::save_png(&image, &self.settings.export_dir) {
                    Ok(path) => self.set_status(format!("Exported {}", path.display())),
                    Err(err) => {
                        log::error!("Failed to write exported image: {}", err);
                        self.set_status(format!("Could not save image: {}", err));
                    }
                },
                Err(err) => self.set_status(format!("Export failed: {}", err)),
            }
        }

        let now = time::current_time_secs();
        if self.status.as_ref().is_some_and(|(_, shown_at)| now - shown_at > STATUS_TIMEOUT) {
            self.status = None;
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let undo = ctx.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z));
        let redo = ctx.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, egui::Key::Y));
        if undo {
            self.session.undo();
        }
        if redo {
            self.session.redo();
        }
    }
}

impl eframe::App for PaintApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.settings.style = *self.session.style();
        eframe::set_value(storage, eframe::APP_KEY, &self.settings);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.begin_frame(ctx.screen_rect());
        self.poll_background_work();
        self.handle_shortcuts(ctx);

        tools_panel(self, ctx);
        central_panel(self, ctx);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_capture_worker<S: SurfaceCapturer>(worker: CaptureWorker<S>) {
    let spawned = std::thread::Builder::new()
        .name("canvas-capture".to_owned())
        .spawn(move || futures::executor::block_on(worker.run()));
    if let Err(err) = spawned {
        // The worker was dropped with the closure; captures will fail as detached
        log::error!("Failed to start capture worker: {}", err);
    }
}

#[cfg(target_arch = "wasm32")]
fn spawn_capture_worker<S: SurfaceCapturer>(worker: CaptureWorker<S>) {
    wasm_bindgen_futures::spawn_local(worker.run());
}
