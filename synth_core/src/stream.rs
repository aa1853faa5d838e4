//! Async frame delivery.
//!
//! Synthesis itself is synchronous CPU work, so it runs on a blocking worker
//! and frames cross to the async side over a bounded channel. Transports
//! consume the returned stream directly.

use std::sync::Arc;

use async_stream::stream;
use futures_core::Stream;
use tokio::sync::mpsc;

use crate::{SynthEngine, SynthesisError};

/// Frames buffered between the synthesis worker and the consumer.
const CHANNEL_CAPACITY: usize = 100;

/// Yields one waveform frame per phoneme, in input order. Errors arrive
/// in-band and end the sequence. Dropping the stream closes the channel,
/// which stops the worker at the next frame boundary.
pub fn frame_stream(
    engine: Arc<SynthEngine>,
    text: String,
) -> impl Stream<Item = Result<Vec<f32>, SynthesisError>> {
    let (tx, mut rx) = mpsc::channel::<Result<Vec<f32>, SynthesisError>>(CHANNEL_CAPACITY);

    tokio::task::spawn_blocking(move || {
        let frames = match engine.synthesize_stream(&text) {
            Ok(frames) => frames,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                return;
            }
        };
        for frame in frames {
            if tx.blocking_send(frame).is_err() {
                // Consumer went away; stop synthesizing.
                break;
            }
        }
    });

    stream! {
        while let Some(item) = rx.recv().await {
            yield item;
        }
    }
}
