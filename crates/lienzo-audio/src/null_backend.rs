//! Silent audio backend.
//!
//! The last candidate in the probe order. Every operation succeeds and no
//! sound comes out: sources are tracked just enough to keep ids honest, a
//! queued buffer counts as instantly consumed, and no source ever reports
//! itself in use. A music streaming thread driven by this backend simply
//! decodes somewhat faster than real time until its track (or loop counter)
//! runs out.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{AudioBackend, SourceId, SourceParams};
use crate::Result;

/// Backend that accepts everything and plays nothing.
pub struct NullBackend {
    state: Mutex<State>,
}

struct State {
    next_id: u64,
    live: HashSet<u64>,
}

impl NullBackend {
    /// Create the backend. Cannot fail.
    pub fn new() -> Self {
        tracing::info!("null audio backend initialized");

        Self {
            state: Mutex::new(State {
                next_id: 1,
                live: HashSet::new(),
            }),
        }
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn set_master_volume(&self, _volume: f32) {}

    fn create_source(&self, _params: SourceParams) -> Result<SourceId> {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.live.insert(id);

        Ok(SourceId(id))
    }

    fn destroy_source(&self, source: SourceId) {
        self.state.lock().live.remove(&source.0);
    }

    fn is_source_used(&self, _source: SourceId) -> bool {
        false
    }

    fn queue_buffer(&self, _source: SourceId, _samples: Arc<[i16]>) -> Result<()> {
        Ok(())
    }

    fn queued_buffers(&self, _source: SourceId) -> usize {
        0
    }

    fn start_source(&self, _source: SourceId) -> Result<()> {
        Ok(())
    }

    fn stop_source(&self, _source: SourceId) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_get_distinct_ids() {
        let backend = NullBackend::new();
        let params = SourceParams { channels: 2, sample_rate: 44_100, looping: false };

        let a = backend.create_source(params).unwrap();
        let b = backend.create_source(params).unwrap();

        assert_ne!(a, b);
        backend.destroy_source(a);
        backend.destroy_source(a); // double destroy is fine
    }

    #[test]
    fn test_everything_succeeds_silently() {
        let backend = NullBackend::new();
        let params = SourceParams { channels: 1, sample_rate: 8_000, looping: true };
        let source = backend.create_source(params).unwrap();

        backend.queue_buffer(source, vec![0i16; 64].into()).unwrap();
        backend.start_source(source).unwrap();

        assert_eq!(backend.queued_buffers(source), 0);
        assert!(!backend.is_source_used(source));

        backend.stop_source(source).unwrap();
        backend.destroy_source(source);
    }
}
