//! Shared fakes for the async integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use timetable_engine::probe::{AsyncConflictProbe, ProbeConflict, ProbeVerdict};
use timetable_engine::{
    AlternativeSlot, Day, DraftEntry, EngineConfig, OwnerRef, Result, TimetableError,
    WeeklyInterval,
};

/// One scripted probe answer.
pub struct Reply {
    pub delay: Duration,
    pub outcome: Result<ProbeVerdict>,
}

impl Reply {
    pub fn clear() -> Self {
        Self::now(Ok(ProbeVerdict::clear()))
    }

    pub fn conflict(message: &str, alternatives: Vec<AlternativeSlot>) -> Self {
        Self::now(Ok(ProbeVerdict::Conflict(ProbeConflict {
            message: message.to_string(),
            alternatives,
            ..ProbeConflict::default()
        })))
    }

    pub fn network_error() -> Self {
        Self::now(Err(TimetableError::Probe("connection refused".to_string())))
    }

    pub fn now(outcome: Result<ProbeVerdict>) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Probe that records every call and answers from a script. Once the script
/// runs out it answers "clear" immediately.
#[derive(Default)]
pub struct FakeProbe {
    calls: Mutex<Vec<(OwnerRef, WeeklyInterval)>>,
    script: Mutex<VecDeque<Reply>>,
}

impl FakeProbe {
    pub fn scripted(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::default(),
            script: Mutex::new(replies.into_iter().collect()),
        })
    }

    pub fn calls(&self) -> Vec<(OwnerRef, WeeklyInterval)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AsyncConflictProbe for FakeProbe {
    async fn probe(&self, owner: &OwnerRef, candidate: &WeeklyInterval) -> Result<ProbeVerdict> {
        self.calls
            .lock()
            .unwrap()
            .push((owner.clone(), candidate.clone()));
        let reply = self.script.lock().unwrap().pop_front();
        match reply {
            Some(reply) => {
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                reply.outcome
            }
            None => Ok(ProbeVerdict::clear()),
        }
    }
}

pub fn entry(day: Day, start: &str, end: &str) -> WeeklyInterval {
    WeeklyInterval::parse(day.name(), start, end).unwrap()
}

pub fn draft(day: &str, start: &str, end: &str) -> DraftEntry {
    DraftEntry::new(day, start, end)
}

pub fn slot(day: Day, start: &str, end: &str) -> AlternativeSlot {
    let e = entry(day, start, end);
    AlternativeSlot::new(day, e.start(), e.end())
}

pub fn config() -> EngineConfig {
    EngineConfig::default()
}

/// Route engine logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
