#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use factreels::Timer;
use factreels::facts::ContentItem;
use serde_json::{Value, json};
use wiremock::{Request, Respond, ResponseTemplate};

/// Virtual clock: `sleep` returns at once and moves `now` forward.
pub struct ManualTimer {
    start: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualTimer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Timer for ManualTimer {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        *self.offset.lock().unwrap() += duration;
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Replies with the scripted responses in order, repeating the last one.
pub struct Script {
    responses: Vec<ResponseTemplate>,
    calls: Arc<AtomicUsize>,
}

impl Script {
    pub fn new(responses: Vec<ResponseTemplate>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                responses,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl Respond for Script {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses[i.min(self.responses.len() - 1)].clone()
    }
}

pub fn json(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

pub fn running(progress: f64) -> ResponseTemplate {
    json(json!({"data": {"state": 4, "progress": progress}}))
}

pub fn succeeded(progress: f64, videos: &[&str]) -> ResponseTemplate {
    json(json!({"data": {"state": 1, "progress": progress, "videos": videos}}))
}

pub fn failed(message: &str) -> ResponseTemplate {
    json(json!({"message": message, "data": {"state": -1, "progress": 20}}))
}

pub fn created(task_id: &str) -> ResponseTemplate {
    json(json!({"data": {"task_id": task_id}}))
}

pub fn pool(n: i64) -> Vec<ContentItem> {
    (1..=n)
        .map(|id| ContentItem {
            id,
            text: format!("Fact number {id} is about the ocean."),
            category: "nature".into(),
            subcategory: "marine".into(),
        })
        .collect()
}

pub fn request() -> factreels::GenerationRequest {
    use rand::SeedableRng;
    let style = factreels::Style {
        voice: Some("en-US-AriaNeural".into()),
        theme: Some("ocean waves".into()),
        ..factreels::Style::default()
    };
    factreels::RequestBuilder::new(&style).for_item(
        &pool(1)[0],
        &mut rand::rngs::StdRng::seed_from_u64(1),
    )
}
