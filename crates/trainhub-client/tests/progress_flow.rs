//! Progress reporting through the tracker against the in-memory backend.

use std::sync::Arc;

use trainhub_client::mock::MockBackend;
use trainhub_core::model::{ContentType, NewModule, NewProgram, NewUnit, ProgressUpdate};
use trainhub_core::progress::{MediaSampler, ProgressPolicy, ProgressTracker};
use trainhub_core::traits::TrainingApi;

async fn unit_with_content(backend: &MockBackend, files: &[&str]) -> (String, Vec<String>) {
    let program = backend
        .create_program(&NewProgram {
            title: "Ladder Safety".into(),
            description: String::new(),
            learning_objectives: vec![],
            expiry_duration: 24,
            renewal_requirements: None,
        })
        .await
        .unwrap();
    let module = backend
        .create_module(&NewModule {
            program_id: program.id.clone(),
            title: "Basics".into(),
            description: String::new(),
            order: 1,
        })
        .await
        .unwrap();
    let unit = backend
        .create_unit(&NewUnit {
            module_id: module.id,
            title: "Setup".into(),
            learning_objectives: vec![],
            order: 1,
        })
        .await
        .unwrap();

    let mut ids = Vec::new();
    for file in files {
        let item = backend
            .upload_content(&unit.id, file, vec![1, 2, 3])
            .await
            .unwrap();
        ids.push(item.id);
    }
    (program.id, ids)
}

#[tokio::test]
async fn media_updates_arrive_in_order() {
    let backend = Arc::new(MockBackend::new());
    let (_, ids) = unit_with_content(&backend, &["setup.mp4"]).await;
    let video = &ids[0];

    let policy = ProgressPolicy::default();
    let tracker = ProgressTracker::new(backend.clone());
    let mut sampler = MediaSampler::new(&policy);

    let mut issued = Vec::new();
    let mut t = 0.0;
    while t <= 200.0 {
        if let Some(update) = sampler.time_update(t, 200.0) {
            tracker.report(video, update.clone());
            issued.push(update);
        }
        t += 0.5;
    }
    if let Some(update) = sampler.ended(200.0) {
        tracker.report(video, update.clone());
        issued.push(update);
    }
    tracker.flush().await;

    let received = backend.progress_updates(video);
    assert_eq!(received, issued);
    let completed: Vec<(f64, u8)> = received
        .iter()
        .filter(|u| u.completed)
        .map(|u| (u.last_position, u.progress_percentage))
        .collect();
    assert_eq!(completed, vec![(190.0, 95), (200.0, 100)]);
    assert_eq!(tracker.failures(), 0);
}

#[tokio::test]
async fn static_completion_and_program_progress() {
    let backend = Arc::new(MockBackend::new());
    let (program_id, ids) = unit_with_content(&backend, &["guide.pdf", "diagram.png", "clip.mp4"]).await;

    let policy = ProgressPolicy::default();
    let tracker = ProgressTracker::new(backend.clone());
    assert!(tracker.mark_complete(&ids[0], ContentType::Pdf, &policy));
    assert!(tracker.mark_complete(&ids[1], ContentType::Image, &policy));
    assert!(!tracker.mark_complete(&ids[2], ContentType::Video, &policy));
    tracker.flush().await;

    assert_eq!(backend.progress_updates(&ids[0])[0].time_spent, 300);
    assert_eq!(backend.progress_updates(&ids[1])[0].time_spent, 30);
    assert!(backend.progress_updates(&ids[2]).is_empty());

    let progress = backend.program_progress(&program_id).await.unwrap();
    assert_eq!(progress.total_items, 3);
    assert_eq!(progress.completed_items, 2);
    assert!((progress.overall_percentage - 200.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn failures_are_logged_not_surfaced() {
    let backend = Arc::new(MockBackend::new());
    let (_, ids) = unit_with_content(&backend, &["guide.pdf"]).await;
    backend.fail_progress(true);

    let tracker = ProgressTracker::new(backend.clone());
    let update = ProgressUpdate {
        progress_percentage: 100,
        last_position: 0.0,
        time_spent: 300,
        completed: true,
    };
    tracker.report(&ids[0], update.clone());
    tracker.flush().await;

    assert_eq!(tracker.failures(), 1);
    assert!(backend.progress_updates(&ids[0]).is_empty());
    // the local copy still reflects what was issued
    assert!(tracker.last_known(&ids[0]).unwrap().completed);

    // the server copy is authoritative
    backend.fail_progress(false);
    let server = tracker.refresh(&ids[0]).await.unwrap();
    assert!(!server.completed);
    assert!(!tracker.last_known(&ids[0]).unwrap().completed);
}

#[tokio::test]
async fn tracker_keeps_working_after_flush() {
    let backend = Arc::new(MockBackend::new());
    let (_, ids) = unit_with_content(&backend, &["guide.pdf"]).await;

    let tracker = ProgressTracker::new(backend.clone());
    let policy = ProgressPolicy::default();
    tracker.mark_complete(&ids[0], ContentType::Pdf, &policy);
    tracker.flush().await;
    tracker.mark_complete(&ids[0], ContentType::Pdf, &policy);
    tracker.flush().await;

    assert_eq!(backend.progress_updates(&ids[0]).len(), 2);
}
