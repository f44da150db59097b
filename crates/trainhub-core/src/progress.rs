//! Content progress tracking.
//!
//! Media (video/audio) is sampled while it plays; static content (pdf,
//! documents, images) completes in one step with an assumed time spent.
//! Reporting is best effort: updates are queued per content id, delivered in
//! issue order by a background task, and failures are logged and dropped.
//! The server copy stays authoritative.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ApiError;
use crate::model::{ContentProgress, ContentType, ProgressUpdate};
use crate::traits::TrainingApi;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Tunable constants of the reporting policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPolicy {
    /// Playback seconds between two sampled media updates.
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: f64,
    /// Percentage at which media counts as completed.
    #[serde(default = "default_completion_threshold")]
    pub completion_threshold: u8,
    /// Assumed time spent on an image.
    #[serde(default = "default_image_time")]
    pub image_time_spent_secs: u64,
    /// Assumed time spent reading a pdf.
    #[serde(default = "default_pdf_time")]
    pub pdf_time_spent_secs: u64,
    /// Assumed time spent on any other document.
    #[serde(default = "default_document_time")]
    pub document_time_spent_secs: u64,
    /// Forward jumps larger than this are seeks and do not count as watched.
    #[serde(default = "default_seek_threshold")]
    pub seek_threshold_secs: f64,
}

fn default_sample_interval() -> f64 {
    10.0
}
fn default_completion_threshold() -> u8 {
    95
}
fn default_image_time() -> u64 {
    30
}
fn default_pdf_time() -> u64 {
    300
}
fn default_document_time() -> u64 {
    180
}
fn default_seek_threshold() -> f64 {
    2.0
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            sample_interval_secs: default_sample_interval(),
            completion_threshold: default_completion_threshold(),
            image_time_spent_secs: default_image_time(),
            pdf_time_spent_secs: default_pdf_time(),
            document_time_spent_secs: default_document_time(),
            seek_threshold_secs: default_seek_threshold(),
        }
    }
}

impl ProgressPolicy {
    /// Assumed time spent on static content; `None` for media.
    pub fn assumed_time_spent(&self, content_type: ContentType) -> Option<u64> {
        match content_type {
            ContentType::Image => Some(self.image_time_spent_secs),
            ContentType::Pdf => Some(self.pdf_time_spent_secs),
            ContentType::Document | ContentType::Unknown => Some(self.document_time_spent_secs),
            ContentType::Video | ContentType::Audio => None,
        }
    }
}

/// `round(position / duration * 100)`, clamped to 0..=100.
pub fn media_percentage(position: f64, duration: f64) -> u8 {
    if !(duration.is_finite() && duration > 0.0) || !position.is_finite() {
        return 0;
    }
    (position / duration * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Images complete as soon as they load; everything else waits for the
/// learner.
pub fn completes_on_load(content_type: ContentType) -> bool {
    content_type == ContentType::Image
}

/// The single update that marks static content as done.
///
/// Returns `None` for media, which completes through playback.
pub fn mark_complete(content_type: ContentType, policy: &ProgressPolicy) -> Option<ProgressUpdate> {
    policy
        .assumed_time_spent(content_type)
        .map(|time_spent| ProgressUpdate {
            progress_percentage: 100,
            last_position: 0.0,
            time_spent,
            completed: true,
        })
}

// ---------------------------------------------------------------------------
// Media sampling
// ---------------------------------------------------------------------------

/// Turns a stream of playback time updates into sparse progress reports.
#[derive(Debug, Clone)]
pub struct MediaSampler {
    interval: f64,
    threshold: u8,
    seek_threshold: f64,
    last_position: f64,
    last_sent_position: f64,
    watched: f64,
    completed_sent: bool,
    ended: bool,
}

impl MediaSampler {
    pub fn new(policy: &ProgressPolicy) -> Self {
        Self {
            interval: policy.sample_interval_secs,
            threshold: policy.completion_threshold,
            seek_threshold: policy.seek_threshold_secs,
            last_position: 0.0,
            last_sent_position: 0.0,
            watched: 0.0,
            completed_sent: false,
            ended: false,
        }
    }

    /// Seconds actually played so far.
    pub fn time_spent(&self) -> u64 {
        self.watched.floor() as u64
    }

    fn advance(&mut self, position: f64) {
        let delta = position - self.last_position;
        if delta > 0.0 && delta <= self.seek_threshold {
            self.watched += delta;
        }
        self.last_position = position;
    }

    /// Feed a playback time update.
    ///
    /// Emits at most one update per sampling window. The first update that
    /// reaches the completion threshold carries `completed = true`; after
    /// that the sampler stays quiet until playback drops below the threshold
    /// again.
    pub fn time_update(&mut self, position: f64, duration: f64) -> Option<ProgressUpdate> {
        if !(duration.is_finite() && duration > 0.0) || !position.is_finite() || position < 0.0 {
            return None;
        }
        let position = position.min(duration);
        self.advance(position);
        if position >= duration {
            // reaching the end is reported by `ended`
            return None;
        }

        let percentage = media_percentage(position, duration);
        if position < duration {
            self.ended = false;
        }
        if percentage < self.threshold {
            self.completed_sent = false;
        } else if self.completed_sent {
            return None;
        }

        if (position - self.last_sent_position).abs() < self.interval {
            return None;
        }
        self.last_sent_position = position;

        let completed = percentage >= self.threshold;
        if completed {
            self.completed_sent = true;
        }
        Some(ProgressUpdate {
            progress_percentage: percentage,
            last_position: position,
            time_spent: self.time_spent(),
            completed,
        })
    }

    /// Playback reached the end: always reports 100% and completed.
    ///
    /// A repeated end event without playback in between is ignored.
    pub fn ended(&mut self, duration: f64) -> Option<ProgressUpdate> {
        if !(duration.is_finite() && duration > 0.0) || self.ended {
            return None;
        }
        self.advance(duration);
        self.ended = true;
        self.completed_sent = true;
        self.last_sent_position = duration;
        Some(ProgressUpdate {
            progress_percentage: 100,
            last_position: duration,
            time_spent: self.time_spent(),
            completed: true,
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

struct Worker {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
    handle: JoinHandle<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fire-and-forget progress reporting.
///
/// Each content id gets its own queue and delivery task, so updates for one
/// item arrive in the order they were issued while different items never
/// wait on each other. Must be used inside a tokio runtime.
pub struct ProgressTracker {
    api: Arc<dyn TrainingApi>,
    workers: Mutex<HashMap<String, Worker>>,
    last_known: Arc<Mutex<HashMap<String, ContentProgress>>>,
    failures: Arc<AtomicU64>,
}

impl ProgressTracker {
    pub fn new(api: Arc<dyn TrainingApi>) -> Self {
        Self {
            api,
            workers: Mutex::new(HashMap::new()),
            last_known: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    fn spawn_worker(&self, content_id: &str) -> Worker {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressUpdate>();
        let api = Arc::clone(&self.api);
        let failures = Arc::clone(&self.failures);
        let last_known = Arc::clone(&self.last_known);
        let content_id = content_id.to_string();

        let handle = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                match api.update_content_progress(&content_id, &update).await {
                    Ok(stored) => {
                        tracing::debug!(
                            content_id = %content_id,
                            percentage = update.progress_percentage,
                            completed = update.completed,
                            "progress reported"
                        );
                        // skip if a newer update was issued meanwhile
                        let mut known = lock(&last_known);
                        if known.get(&content_id) == Some(&update.to_progress(&content_id)) {
                            known.insert(content_id.clone(), stored);
                        }
                    }
                    Err(e) => {
                        failures.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(content_id = %content_id, "dropping progress update: {e}");
                    }
                }
            }
        });

        Worker { tx, handle }
    }

    /// Queue an update and return immediately.
    pub fn report(&self, content_id: &str, update: ProgressUpdate) {
        lock(&self.last_known).insert(content_id.to_string(), update.to_progress(content_id));

        let mut workers = lock(&self.workers);
        let worker = workers
            .entry(content_id.to_string())
            .or_insert_with(|| self.spawn_worker(content_id));

        let sent = worker.tx.send(update);
        if let Err(mpsc::error::SendError(update)) = sent {
            tracing::warn!(content_id, "progress worker gone, restarting");
            let fresh = self.spawn_worker(content_id);
            let _ = fresh.tx.send(update);
            workers.insert(content_id.to_string(), fresh);
        }
    }

    /// Report the static completion of a pdf, document or image.
    ///
    /// Returns `false` for media, which completes through playback.
    pub fn mark_complete(
        &self,
        content_id: &str,
        content_type: ContentType,
        policy: &ProgressPolicy,
    ) -> bool {
        match mark_complete(content_type, policy) {
            Some(update) => {
                self.report(content_id, update);
                true
            }
            None => false,
        }
    }

    /// Last progress issued or fetched for `content_id`.
    pub fn last_known(&self, content_id: &str) -> Option<ContentProgress> {
        lock(&self.last_known).get(content_id).cloned()
    }

    /// Replace the local copy with the server's.
    pub async fn refresh(&self, content_id: &str) -> Result<ContentProgress, ApiError> {
        let mut progress = self.api.content_progress(content_id).await?;
        if progress.content_id.is_empty() {
            progress.content_id = content_id.to_string();
        }
        lock(&self.last_known).insert(content_id.to_string(), progress.clone());
        Ok(progress)
    }

    /// Number of updates that could not be delivered.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Deliver everything queued so far and stop the workers.
    pub async fn flush(&self) {
        let workers: Vec<(String, Worker)> = lock(&self.workers).drain().collect();
        for (content_id, worker) in workers {
            drop(worker.tx);
            if let Err(e) = worker.handle.await {
                tracing::warn!(content_id = %content_id, "progress worker panicked: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(sampler: &mut MediaSampler, duration: f64, until: f64) -> Vec<ProgressUpdate> {
        let mut updates = Vec::new();
        let mut t = 0.0;
        while t <= until {
            if let Some(u) = sampler.time_update(t, duration) {
                updates.push(u);
            }
            t += 0.25;
        }
        updates
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(media_percentage(33.0, 200.0), 17); // 16.5 rounds up
        assert_eq!(media_percentage(1.0, 3.0), 33);
        assert_eq!(media_percentage(250.0, 200.0), 100);
        assert_eq!(media_percentage(10.0, 0.0), 0);
        assert_eq!(media_percentage(10.0, f64::NAN), 0);
    }

    #[test]
    fn samples_once_per_interval() {
        let mut sampler = MediaSampler::new(&ProgressPolicy::default());
        let updates = play(&mut sampler, 120.0, 45.0);

        let positions: Vec<f64> = updates.iter().map(|u| u.last_position).collect();
        assert_eq!(positions, vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(updates[1].progress_percentage, media_percentage(20.0, 120.0));
        assert!(updates.iter().all(|u| !u.completed));
        assert_eq!(updates[3].time_spent, 40);
    }

    #[test]
    fn completion_is_sent_once_past_threshold() {
        let mut sampler = MediaSampler::new(&ProgressPolicy::default());
        let updates = play(&mut sampler, 200.0, 199.75);

        let completed: Vec<&ProgressUpdate> = updates.iter().filter(|u| u.completed).collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].progress_percentage, 95);
        // nothing after the completion sample
        assert!(std::ptr::eq(completed[0], updates.last().unwrap()));

        let end = sampler.ended(200.0).unwrap();
        assert_eq!(end.progress_percentage, 100);
        assert!(end.completed);
        assert_eq!(end.last_position, 200.0);
        assert!(sampler.ended(200.0).is_none());
    }

    #[test]
    fn end_of_media_reports_completion_once() {
        let mut sampler = MediaSampler::new(&ProgressPolicy::default());
        let mut updates = play(&mut sampler, 100.0, 100.0);
        updates.extend(sampler.ended(100.0));

        let completed: Vec<(f64, u8)> = updates
            .iter()
            .filter(|u| u.completed)
            .map(|u| (u.last_position, u.progress_percentage))
            .collect();
        assert_eq!(completed, vec![(100.0, 100)]);
        assert!(sampler.time_update(100.0, 100.0).is_none());
    }

    #[test]
    fn seeks_do_not_count_as_watched() {
        let mut sampler = MediaSampler::new(&ProgressPolicy::default());
        assert!(sampler.time_update(1.0, 600.0).is_none());
        let update = sampler.time_update(300.0, 600.0).unwrap();
        assert_eq!(update.progress_percentage, 50);
        assert_eq!(update.time_spent, 1);
    }

    #[test]
    fn replay_can_complete_again() {
        let mut sampler = MediaSampler::new(&ProgressPolicy::default());
        assert!(sampler.ended(60.0).is_some());
        assert!(sampler.time_update(5.0, 60.0).is_some()); // moved back 55s
        assert!(sampler.ended(60.0).is_some());
    }

    #[test]
    fn invalid_duration_emits_nothing() {
        let mut sampler = MediaSampler::new(&ProgressPolicy::default());
        assert!(sampler.time_update(30.0, f64::INFINITY).is_none());
        assert!(sampler.time_update(30.0, 0.0).is_none());
        assert!(sampler.ended(-1.0).is_none());
    }

    #[test]
    fn static_completion_uses_policy_constants() {
        let policy = ProgressPolicy::default();
        let image = mark_complete(ContentType::Image, &policy).unwrap();
        assert_eq!(image.time_spent, 30);
        assert!(image.completed);
        assert_eq!(image.progress_percentage, 100);
        assert_eq!(mark_complete(ContentType::Pdf, &policy).unwrap().time_spent, 300);
        assert_eq!(mark_complete(ContentType::Document, &policy).unwrap().time_spent, 180);
        assert_eq!(mark_complete(ContentType::Unknown, &policy).unwrap().time_spent, 180);
        assert!(mark_complete(ContentType::Video, &policy).is_none());

        let tuned = ProgressPolicy {
            pdf_time_spent_secs: 600,
            ..ProgressPolicy::default()
        };
        assert_eq!(mark_complete(ContentType::Pdf, &tuned).unwrap().time_spent, 600);
    }

    #[test]
    fn only_images_complete_on_load() {
        assert!(completes_on_load(ContentType::Image));
        assert!(!completes_on_load(ContentType::Pdf));
        assert!(!completes_on_load(ContentType::Video));
    }

    #[test]
    fn policy_defaults_fill_missing_fields() {
        let policy: ProgressPolicy =
            serde_json::from_value(serde_json::json!({"pdf_time_spent_secs": 120})).unwrap();
        assert_eq!(policy.pdf_time_spent_secs, 120);
        assert_eq!(policy.image_time_spent_secs, 30);
        assert_eq!(policy.completion_threshold, 95);
    }
}
