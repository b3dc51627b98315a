//! Rodio-backed output running on a dedicated OS thread.

use std::io::Cursor;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::output::{AudioOutput, PlaybackError};

struct PlayRequest {
    bytes: Vec<u8>,
    device: Option<String>,
    done: oneshot::Sender<Result<(), PlaybackError>>,
}

/// Plays clips through rodio.
///
/// Rodio's output stream is not `Send`, so all device work happens on
/// one named thread; async callers hand requests over a channel and
/// await the result. Dropping the output closes the channel, lets the
/// thread finish the clip in flight and joins it.
pub struct RodioOutput {
    tx: Option<mpsc::UnboundedSender<PlayRequest>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl RodioOutput {
    pub fn spawn() -> Result<Self, PlaybackError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let thread = std::thread::Builder::new()
            .name("voxdub-playback".to_string())
            .spawn(move || playback_thread(rx))
            .map_err(|e| PlaybackError::Device(format!("spawn playback thread: {e}")))?;
        Ok(Self {
            tx: Some(tx),
            thread: Some(thread),
        })
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[async_trait]
impl AudioOutput for RodioOutput {
    async fn play(&self, bytes: &[u8], device: Option<&str>) -> Result<(), PlaybackError> {
        let Some(tx) = &self.tx else {
            return Err(PlaybackError::Closed);
        };
        let (done_tx, done_rx) = oneshot::channel();
        tx.send(PlayRequest {
            bytes: bytes.to_vec(),
            device: device.map(str::to_string),
            done: done_tx,
        })
        .map_err(|_| PlaybackError::Closed)?;
        done_rx.await.map_err(|_| PlaybackError::Closed)?
    }
}

fn playback_thread(mut rx: mpsc::UnboundedReceiver<PlayRequest>) {
    tracing::debug!(target: "playback", "output thread started");
    while let Some(request) = rx.blocking_recv() {
        let result = play_one(&request.bytes, request.device.as_deref());
        let _ = request.done.send(result);
    }
    tracing::debug!(target: "playback", "output thread stopped");
}

fn play_one(bytes: &[u8], device: Option<&str>) -> Result<(), PlaybackError> {
    let (_stream, handle) = open_output(device)?;
    let sink = rodio::Sink::try_new(&handle).map_err(|e| PlaybackError::Device(e.to_string()))?;
    let source =
        rodio::Decoder::new(Cursor::new(bytes.to_vec())).map_err(|e| PlaybackError::Decode(e.to_string()))?;
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

/// Opens the requested device by name, falling back to the default
/// output when it is missing or refuses to open.
fn open_output(
    device: Option<&str>,
) -> Result<(rodio::OutputStream, rodio::OutputStreamHandle), PlaybackError> {
    use rodio::cpal::traits::{DeviceTrait, HostTrait};

    if let Some(name) = device {
        let host = rodio::cpal::default_host();
        let found = host
            .output_devices()
            .ok()
            .and_then(|mut devices| devices.find(|d| d.name().map(|n| n == name).unwrap_or(false)));
        match found {
            Some(dev) => match rodio::OutputStream::try_from_device(&dev) {
                Ok(pair) => return Ok(pair),
                Err(e) => {
                    tracing::warn!(
                        target: "playback",
                        device = name,
                        error = %e,
                        "requested output device failed to open, using default"
                    );
                }
            },
            None => {
                tracing::warn!(
                    target: "playback",
                    device = name,
                    "requested output device not found, using default"
                );
            }
        }
    }

    rodio::OutputStream::try_default().map_err(|e| PlaybackError::Device(e.to_string()))
}
