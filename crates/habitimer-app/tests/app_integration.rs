use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use habitimer_app::{listener, App, EventKind, RecordEvent, SessionStatus, Subscription};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[tokio::test]
async fn test_session_history_flow() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let app = App::open(Some(temp_dir.path().to_path_buf())).await?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let history_view = Subscription::new(
        app.event_bus.clone(),
        &EventKind::ALL,
        listener(move |event: &RecordEvent| sink.lock().unwrap().push(event.kind())),
    );

    let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
    app.session.start(start).await?;
    let first = app
        .session
        .stop(start + Duration::minutes(30), Some("piano".to_string()))
        .await?;

    app.session.start(start + Duration::hours(1)).await?;
    let second = app.session.stop(start + Duration::hours(2), None).await?;

    let mut edited = first.clone();
    edited.set_note(Some("piano scales".to_string()));
    app.records.update(edited).await?;
    app.records.delete(&second.id).await?;

    drop(history_view);
    app.records.clear_all().await?;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            EventKind::RecordAdded,
            EventKind::RecordAdded,
            EventKind::RecordUpdated,
            EventKind::RecordDeleted,
        ]
    );
    assert!(app.records.list().await.is_empty());
    assert_eq!(app.session.status(Utc::now()).await?, SessionStatus::Idle);

    Ok(())
}

#[tokio::test]
async fn test_running_session_survives_restart() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

    {
        let app = App::open(Some(temp_dir.path().to_path_buf())).await?;
        app.session.start(start).await?;
        // dropped without stopping, as if the app was killed
    }

    let app = App::open(Some(temp_dir.path().to_path_buf())).await?;
    assert_eq!(
        app.session.status(start + Duration::minutes(5)).await?,
        SessionStatus::Running {
            started_at: start,
            elapsed: Duration::minutes(5),
        }
    );

    let record = app.session.stop(start + Duration::minutes(20), None).await?;
    assert_eq!(record.duration_seconds, 1200);

    let reopened = App::open(Some(temp_dir.path().to_path_buf())).await?;
    assert_eq!(reopened.timer_store.get_start_time().await?, None);
    assert_eq!(reopened.records.list().await, vec![record]);

    Ok(())
}
