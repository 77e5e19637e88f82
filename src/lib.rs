#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod capture;
pub mod document;
pub mod error;
pub mod geometry;
pub mod history;
pub mod input;
pub mod panels;
pub mod persistence;
pub mod renderer;
pub mod session;
pub mod settings;
pub mod stroke;
pub mod util;

pub use app::PaintApp;
pub use capture::{
    capture_pipeline, CaptureCoordinator, CaptureWorker, LayoutGate, PixelFormat, SoftwareSurface,
    SurfaceCapturer,
};
pub use document::CanvasDocument;
pub use error::{CaptureError, PersistenceError, StyleError};
pub use history::{ChangeKind, HistoryChange, StrokeHistory};
pub use input::{CanvasInput, InputHandler};
pub use renderer::Renderer;
pub use session::CanvasSession;
pub use settings::CanvasSettings;
pub use stroke::{Stroke, StrokeStyle};
