//! Asynchronous capture of the canvas into a raster image.
//!
//! A [`CaptureCoordinator`] accepts requests from the UI and a
//! [`CaptureWorker`] services them one at a time, in submission order, on
//! whatever executor the application provides. The platform only has to
//! implement [`SurfaceCapturer`]; waiting for layout, FIFO delivery and the
//! exactly-once callback guarantee live here.

mod gate;
mod surface;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::channel::{mpsc, oneshot};
use futures::future::{self, Either};
use futures::StreamExt;
use image::{DynamicImage, RgbaImage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

pub use gate::LayoutGate;
pub use surface::{
    rasterize, CaptureTarget, SoftwareSurface, SurfaceCapturer, SurfaceFuture, DEFAULT_TOLERANCE,
    MAX_SURFACE_DIMENSION,
};

/// Pixel layout of a captured image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    Rgba8,
    Rgb8,
    Luma8,
    LumaA8,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 4] = [
        PixelFormat::Rgba8,
        PixelFormat::Rgb8,
        PixelFormat::Luma8,
        PixelFormat::LumaA8,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Rgba8 => "RGBA 8-bit",
            PixelFormat::Rgb8 => "RGB 8-bit",
            PixelFormat::Luma8 => "Grayscale 8-bit",
            PixelFormat::LumaA8 => "Grayscale + alpha 8-bit",
        }
    }

    /// Convert captured RGBA pixels into this format
    pub fn convert(&self, pixels: RgbaImage) -> DynamicImage {
        let image = DynamicImage::ImageRgba8(pixels);
        match self {
            PixelFormat::Rgba8 => image,
            PixelFormat::Rgb8 => DynamicImage::ImageRgb8(image.into_rgb8()),
            PixelFormat::Luma8 => DynamicImage::ImageLuma8(image.into_luma8()),
            PixelFormat::LumaA8 => DynamicImage::ImageLumaA8(image.into_luma_alpha8()),
        }
    }
}

/// Identifies a capture request, in submission order
pub type CaptureId = u64;

pub type CaptureResult = Result<DynamicImage, CaptureError>;

/// Receives the outcome of one capture request
pub type CaptureCallback = Box<dyn FnOnce(CaptureResult) + Send + 'static>;

/// Holds a callback until it has been called.
///
/// A ticket that is dropped before completing reports [`CaptureError::Detached`],
/// so a request can never be left without an answer.
struct CaptureTicket {
    id: CaptureId,
    callback: Option<CaptureCallback>,
}

impl CaptureTicket {
    fn complete(mut self, result: CaptureResult) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }
}

impl Drop for CaptureTicket {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            debug!("Capture {} abandoned", self.id);
            callback(Err(CaptureError::Detached));
        }
    }
}

struct CaptureJob {
    format: PixelFormat,
    ticket: CaptureTicket,
}

/// Create a coordinator and the worker that services its requests.
///
/// The worker must be driven with [`CaptureWorker::run`] on an executor. It
/// finishes once the coordinator is dropped; dropping the coordinator counts as
/// tearing the surface down, so whatever is still queued fails as detached.
pub fn capture_pipeline<S: SurfaceCapturer>(surface: S) -> (CaptureCoordinator, CaptureWorker<S>) {
    let (sender, receiver) = mpsc::unbounded();
    let gate = LayoutGate::new();

    let coordinator = CaptureCoordinator {
        sender,
        gate: gate.clone(),
        next_id: AtomicU64::new(1),
    };
    let worker = CaptureWorker { receiver, gate, surface };
    (coordinator, worker)
}

/// Request side of the capture pipeline, owned by the canvas surface
pub struct CaptureCoordinator {
    sender: mpsc::UnboundedSender<CaptureJob>,
    gate: LayoutGate,
    next_id: AtomicU64,
}

impl std::fmt::Debug for CaptureCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureCoordinator")
            .field("gate", &self.gate)
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl std::fmt::Debug for CaptureJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureJob")
            .field("id", &self.ticket.id)
            .field("format", &self.format)
            .finish()
    }
}

impl CaptureCoordinator {
    /// Queue a capture. `callback` is called exactly once, with either the image
    /// or the reason the capture failed.
    pub fn request_capture<F>(&self, format: PixelFormat, callback: F) -> CaptureId
    where
        F: FnOnce(CaptureResult) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = CaptureJob {
            format,
            ticket: CaptureTicket {
                id,
                callback: Some(Box::new(callback)),
            },
        };

        debug!("Capture {} requested ({:?})", id, format);
        if let Err(err) = self.sender.unbounded_send(job) {
            // The worker is gone; dropping the job answers the callback
            warn!("Capture {} rejected: worker stopped", id);
            drop(err.into_inner());
        }
        id
    }

    /// Future flavor of [`CaptureCoordinator::request_capture`]
    pub fn capture(
        &self,
        format: PixelFormat,
    ) -> impl Future<Output = CaptureResult> + Send + 'static {
        let (sender, receiver) = oneshot::channel();
        self.request_capture(format, move |result| {
            let _ = sender.send(result);
        });
        async move { receiver.await.unwrap_or(Err(CaptureError::Detached)) }
    }

    /// The layout gate the surface reports its measurements to
    pub fn layout(&self) -> &LayoutGate {
        &self.gate
    }

    /// The surface is being torn down; pending and future captures fail
    pub fn detach(&self) {
        debug!("Capture surface detached");
        self.gate.detach();
    }
}

impl Drop for CaptureCoordinator {
    // The coordinator lives as long as its surface
    fn drop(&mut self) {
        self.gate.detach();
    }
}

/// Service side of the capture pipeline
pub struct CaptureWorker<S> {
    receiver: mpsc::UnboundedReceiver<CaptureJob>,
    gate: LayoutGate,
    surface: S,
}

impl<S> std::fmt::Debug for CaptureWorker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureWorker").field("gate", &self.gate).finish()
    }
}

impl<S: SurfaceCapturer> CaptureWorker<S> {
    /// Process requests until the coordinator is dropped
    pub async fn run(mut self) {
        while let Some(job) = self.receiver.next().await {
            let CaptureJob { format, ticket } = job;
            let result = self.capture_one(format).await;
            match &result {
                Ok(image) => debug!(
                    "Capture {} delivered ({}x{})",
                    ticket.id,
                    image.width(),
                    image.height()
                ),
                Err(err) => warn!("Capture {} failed: {}", ticket.id, err),
            }
            ticket.complete(result);
        }
        debug!("Capture worker stopped");
    }

    async fn capture_one(&self, format: PixelFormat) -> CaptureResult {
        let [width, height] = self.gate.ready().await?;
        if width == 0 || height == 0 {
            return Err(CaptureError::ZeroArea { width, height });
        }

        let grab = self.surface.capture_surface(CaptureTarget { size: [width, height] });
        let detached = Box::pin(self.gate.detached());
        match future::select(grab, detached).await {
            Either::Left((pixels, _)) => pixels.map(|pixels| format.convert(pixels)),
            Either::Right(((), _)) => Err(CaptureError::Detached),
        }
    }
}
