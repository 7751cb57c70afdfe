//! MJPEG streaming of analysed camera frames.
//!
//! The feed is `multipart/x-mixed-replace`: each frame is one JPEG part
//! separated by the boundary marker, and the browser swaps the image in
//! place. Frames are pulled on demand, so nothing is read from the camera
//! once the client stops polling the body.

use crate::pipeline::FramePipeline;
use crate::session::SharedDevice;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::{BufMut, Bytes, BytesMut};
use futures_util::stream::{self, Stream, StreamExt};
use sentinel_core::CameraSection;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

/// Boundary string separating MJPEG parts.
pub const BOUNDARY: &str = "frame";

/// Wrap one JPEG as a multipart part.
pub fn frame_part(jpeg: &[u8]) -> Bytes {
    let header = format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", BOUNDARY);
    let mut part = BytesMut::with_capacity(header.len() + jpeg.len() + 2);
    part.put_slice(header.as_bytes());
    part.put_slice(jpeg);
    part.put_slice(b"\r\n");
    part.freeze()
}

/// Logs when a stream ends, whether the device closed or the client left.
struct StreamGuard {
    section: CameraSection,
    frames: u64,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        info!("Stream for {} stopped after {} frames", self.section, self.frames);
    }
}

/// Lazy stream of multipart parts for `section`. Ends when the device is
/// closed or a read fails; never restarts.
pub fn frame_stream(
    pipeline: Arc<FramePipeline>,
    section: CameraSection,
    device: SharedDevice,
) -> impl Stream<Item = Bytes> + Send + 'static {
    info!("Stream for {} started", section);
    let guard = StreamGuard { section, frames: 0 };

    stream::unfold(
        (pipeline, device, guard),
        |(pipeline, device, mut guard)| async move {
            let analysed = pipeline.next_frame(guard.section, &device).await?;
            guard.frames += 1;
            Some((frame_part(&analysed.jpeg), (pipeline, device, guard)))
        },
    )
}

/// The streaming HTTP response for `section`.
pub fn mjpeg_response(pipeline: Arc<FramePipeline>, section: CameraSection, device: SharedDevice) -> Response {
    let body = Body::from_stream(frame_stream(pipeline, section, device).map(Ok::<_, Infallible>));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format!("multipart/x-mixed-replace; boundary={}", BOUNDARY)),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate".to_string()),
            (header::PRAGMA, "no-cache".to_string()),
        ],
        body,
    )
        .into_response()
}
