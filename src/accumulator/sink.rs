//! Narration sinks: where flushed chunks go

/// One flushed chunk of new screen text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationChunk {
    pub text: String,
    /// Characters of new content accumulated into this chunk
    pub changed_char_count: usize,
}

/// Receiver of flushed chunks.
///
/// Called synchronously from the accumulator on every flush; the
/// accumulator makes no assumptions about what the sink does with the text.
pub trait NarrationSink: Send {
    fn on_chunk_ready(&mut self, chunk: String, changed_char_count: usize);
}

impl<F> NarrationSink for F
where
    F: FnMut(String, usize) + Send,
{
    fn on_chunk_ready(&mut self, chunk: String, changed_char_count: usize) {
        self(chunk, changed_char_count)
    }
}

/// Forwards chunks into an unbounded channel
#[cfg(feature = "streaming")]
#[derive(Debug, Clone)]
pub struct ChannelSink(pub tokio::sync::mpsc::UnboundedSender<NarrationChunk>);

#[cfg(feature = "streaming")]
impl NarrationSink for ChannelSink {
    fn on_chunk_ready(&mut self, chunk: String, changed_char_count: usize) {
        if self
            .0
            .send(NarrationChunk {
                text: chunk,
                changed_char_count,
            })
            .is_err()
        {
            tracing::warn!("Narration receiver dropped, chunk discarded");
        }
    }
}
