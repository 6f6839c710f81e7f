mod common;

use std::time::Duration;

use common::{harness, FakeProvider};
use stresswatch::{
    models::{Detection, SessionStatus},
    Database, ScriptedSampleSource,
};
use tokio::time::sleep;

fn stressed_then_calm() -> ScriptedSampleSource {
    ScriptedSampleSource::new([Detection::Intensity(90)]).with_fallback(Detection::Intensity(10))
}

#[tokio::test(start_paused = true)]
async fn completed_session_is_restored_by_a_fresh_monitor() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("monitor.db")).unwrap();

    let first = harness(FakeProvider::granting(), stressed_then_calm(), 1_000, Some(db.clone()));
    let snapshot = first.session.start().await.unwrap();
    let session_id = snapshot.session_id.unwrap();
    sleep(Duration::from_millis(2_500)).await;
    first.session.submit_feedback(3).unwrap();
    first.session.stop().await;

    assert_eq!(db.count_samples(&session_id).await.unwrap(), 2);
    let stored = db.get_session(&session_id).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);
    assert!(stored.stopped_at.is_some());
    assert_eq!(stored.interval_ms, 1_000);

    let sessions = db.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, session_id);
    assert_eq!(sessions[0].status, SessionStatus::Completed);

    let second = harness(FakeProvider::granting(), stressed_then_calm(), 1_000, Some(db.clone()));
    let report = second.session.restore_history().await.unwrap();
    assert!(report.interrupted_sessions.is_empty());
    assert_eq!(report.samples, 2);
    assert!(report.feedback_restored);

    assert_eq!(second.session.history().entries(), first.session.history().entries());
    let summary = second.session.summary().to_string();
    assert!(summary.contains("Total stress instances: 1"), "{summary}");
    assert!(summary.contains("Latest feedback: 3/5"), "{summary}");
}

#[tokio::test(start_paused = true)]
async fn unstopped_session_is_marked_interrupted_on_restore() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("monitor.db")).unwrap();

    let abandoned = harness(FakeProvider::granting(), stressed_then_calm(), 1_000, Some(db.clone()));
    let session_id = abandoned.session.start().await.unwrap().session_id.unwrap();
    sleep(Duration::from_millis(1_500)).await;
    drop(abandoned);

    let fresh = harness(FakeProvider::granting(), stressed_then_calm(), 1_000, Some(db.clone()));
    let report = fresh.session.restore_history().await.unwrap();
    assert_eq!(report.interrupted_sessions, vec![session_id.clone()]);
    assert_eq!(report.samples, 1);
    assert!(!report.feedback_restored);

    let stored = db.get_session(&session_id).await.unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Interrupted);

    let finished = fresh.session.start().await.unwrap().session_id.unwrap();
    fresh.session.stop().await;
    let statuses: Vec<(String, SessionStatus)> = db
        .list_sessions()
        .await
        .unwrap()
        .into_iter()
        .map(|record| (record.id, record.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (session_id.clone(), SessionStatus::Interrupted),
            (finished, SessionStatus::Completed),
        ]
    );

    let again = fresh.session.restore_history().await.unwrap();
    assert!(again.interrupted_sessions.is_empty());
    assert_eq!(again.samples, 0);
}

#[tokio::test(start_paused = true)]
async fn restore_without_storage_is_empty() {
    let h = harness(FakeProvider::granting(), stressed_then_calm(), 1_000, None);
    let report = h.session.restore_history().await.unwrap();
    assert_eq!(report.samples, 0);
    assert!(h.session.history().is_empty());
}
