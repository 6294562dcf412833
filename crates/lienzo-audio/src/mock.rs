//! Deterministic mock backend for tests.
//!
//! Records every call and models the source queue without any real output.
//! Tests steer it explicitly: [`MockBackend::consume_buffers`] simulates the
//! hardware eating queued data (which un-throttles the music streaming
//! thread), [`MockBackend::drain_source`] marks a source as naturally
//! finished so the mixer sees its voice as reusable.
//!
//! The backend is a cheap handle around shared state, so a test can keep a
//! clone for assertions while the mixer owns another.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{AudioBackend, SourceId, SourceParams};
use crate::Result;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    /// `set_master_volume(volume)`.
    SetMasterVolume(f32),
    /// `create_source` returning the given id.
    CreateSource(u64, SourceParams),
    /// `destroy_source(id)`.
    DestroySource(u64),
    /// `queue_buffer(id, n_samples)`.
    QueueBuffer(u64, usize),
    /// `start_source(id)`.
    StartSource(u64),
    /// `stop_source(id)`.
    StopSource(u64),
}

#[derive(Debug)]
struct MockSource {
    params: SourceParams,
    queued: Vec<usize>,
    playing: bool,
    drained: bool,
    total_queued_samples: usize,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    master_volume: f32,
    sources: HashMap<u64, MockSource>,
    calls: Vec<MockCall>,
}

/// Call-recording backend. `Clone` shares the underlying state.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a fresh mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything that has been called so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Number of live (created, not destroyed) sources.
    pub fn live_sources(&self) -> usize {
        self.state.lock().sources.len()
    }

    /// The last master volume set.
    pub fn master_volume(&self) -> f32 {
        self.state.lock().master_volume
    }

    /// Total samples ever queued on a source, drained or not.
    pub fn total_queued_samples(&self, source: SourceId) -> usize {
        self.state
            .lock()
            .sources
            .get(&source.0)
            .map_or(0, |s| s.total_queued_samples)
    }

    /// Simulate the device consuming `count` queued buffers.
    pub fn consume_buffers(&self, source: SourceId, count: usize) {
        let mut state = self.state.lock();
        if let Some(src) = state.sources.get_mut(&source.0) {
            let n = count.min(src.queued.len());
            src.queued.drain(..n);
        }
    }

    /// Simulate a source reaching its natural end: queue empty, no longer
    /// "used". The mixer will treat the owning voice as reusable.
    pub fn drain_source(&self, source: SourceId) {
        let mut state = self.state.lock();
        if let Some(src) = state.sources.get_mut(&source.0) {
            src.queued.clear();
            src.drained = true;
            src.playing = false;
        }
    }
}

impl AudioBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn set_master_volume(&self, volume: f32) {
        let mut state = self.state.lock();
        state.master_volume = volume.clamp(0.0, 1.0);
        let v = state.master_volume;
        state.calls.push(MockCall::SetMasterVolume(v));
    }

    fn create_source(&self, params: SourceParams) -> Result<SourceId> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;

        state.sources.insert(
            id,
            MockSource {
                params,
                queued: Vec::new(),
                playing: false,
                drained: false,
                total_queued_samples: 0,
            },
        );
        state.calls.push(MockCall::CreateSource(id, params));

        Ok(SourceId(id))
    }

    fn destroy_source(&self, source: SourceId) {
        let mut state = self.state.lock();
        state.sources.remove(&source.0);
        state.calls.push(MockCall::DestroySource(source.0));
    }

    fn is_source_used(&self, source: SourceId) -> bool {
        let state = self.state.lock();
        state
            .sources
            .get(&source.0)
            .is_some_and(|s| !s.drained && (s.playing || !s.queued.is_empty()))
    }

    fn queue_buffer(&self, source: SourceId, samples: Arc<[i16]>) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::QueueBuffer(source.0, samples.len()));

        if let Some(src) = state.sources.get_mut(&source.0) {
            src.queued.push(samples.len());
            src.total_queued_samples += samples.len();
            src.drained = false;
        }

        Ok(())
    }

    fn queued_buffers(&self, source: SourceId) -> usize {
        self.state
            .lock()
            .sources
            .get(&source.0)
            .map_or(0, |s| s.queued.len())
    }

    fn start_source(&self, source: SourceId) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::StartSource(source.0));

        if let Some(src) = state.sources.get_mut(&source.0) {
            src.playing = true;
        }

        Ok(())
    }

    fn stop_source(&self, source: SourceId) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::StopSource(source.0));

        if let Some(src) = state.sources.get_mut(&source.0) {
            src.playing = false;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_log_order() {
        let mock = MockBackend::new();
        let params = SourceParams { channels: 1, sample_rate: 22_050, looping: false };

        let source = mock.create_source(params).unwrap();
        mock.queue_buffer(source, vec![0i16; 100].into()).unwrap();
        mock.start_source(source).unwrap();
        mock.stop_source(source).unwrap();
        mock.destroy_source(source);

        assert_eq!(
            mock.calls(),
            vec![
                MockCall::CreateSource(source.0, params),
                MockCall::QueueBuffer(source.0, 100),
                MockCall::StartSource(source.0),
                MockCall::StopSource(source.0),
                MockCall::DestroySource(source.0),
            ]
        );
    }

    #[test]
    fn test_consumption_and_drain() {
        let mock = MockBackend::new();
        let params = SourceParams { channels: 2, sample_rate: 44_100, looping: false };
        let source = mock.create_source(params).unwrap();

        for _ in 0..4 {
            mock.queue_buffer(source, vec![0i16; 10].into()).unwrap();
        }
        mock.start_source(source).unwrap();

        assert_eq!(mock.queued_buffers(source), 4);
        assert!(mock.is_source_used(source));

        mock.consume_buffers(source, 3);
        assert_eq!(mock.queued_buffers(source), 1);
        assert!(mock.is_source_used(source));

        mock.drain_source(source);
        assert_eq!(mock.queued_buffers(source), 0);
        assert!(!mock.is_source_used(source));
    }
}
