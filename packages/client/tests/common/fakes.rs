use async_trait::async_trait;
use cardgen_client::{
    EndpointError, FixedClock, GenerationEndpoint, MemoryStorage, QuotaTracker, Sleeper,
    SubmissionRequest,
};
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
}

/// Tracker over the given storage with the clock pinned to `today`
pub fn tracker_on(storage: Arc<MemoryStorage>, today: &str, limit: u32) -> (QuotaTracker, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(day(today)));
    let tracker = QuotaTracker::new(storage, clock.clone(), limit);
    (tracker, clock)
}

/// Endpoint replaying a fixed script of results, then failing
#[derive(Default)]
pub struct ScriptedEndpoint {
    script: Mutex<VecDeque<Result<String, EndpointError>>>,
    requests: Mutex<Vec<SubmissionRequest>>,
}

impl ScriptedEndpoint {
    pub fn new(script: Vec<Result<String, EndpointError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<SubmissionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationEndpoint for ScriptedEndpoint {
    async fn generate(&self, request: &SubmissionRequest) -> Result<String, EndpointError> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(EndpointError::Transport("script exhausted".to_string())))
    }
}

/// Sleeper that records requested delays without waiting
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}
