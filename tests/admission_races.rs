use std::collections::HashSet;
use std::sync::Arc;

use ulid::Ulid;

use seatline::catalog;
use seatline::engine::Engine;
use seatline::journal::Journal;
use seatline::model::{Admission, CourseSpec, EnrollmentEvent, PriorityTier};
use seatline::records::InMemoryStudentRecords;

// ── Test infrastructure ──────────────────────────────────────

async fn engine_with_course(id: &str, capacity: u32) -> Arc<Engine> {
    let engine = Engine::new(Arc::new(InMemoryStudentRecords::new()));
    engine
        .register_course(CourseSpec::new(id, "Main Campus", capacity))
        .await
        .unwrap();
    Arc::new(engine)
}

async fn assert_consistent(engine: &Engine, course_id: &str) {
    let info = engine.get_course(course_id).await.unwrap();
    assert!(info.enrolled <= info.capacity, "over capacity: {info:?}");

    let waitlist = engine.get_waitlist(course_id).await.unwrap();
    let positions: Vec<u32> = waitlist.iter().map(|e| e.position).collect();
    let expected: Vec<u32> = (1..=waitlist.len() as u32).collect();
    assert_eq!(positions, expected, "waitlist positions not contiguous");

    if !waitlist.is_empty() {
        assert_eq!(info.enrolled, info.capacity, "seat idle while students wait");
    }

    let roster: HashSet<String> = engine.get_roster(course_id).await.unwrap().into_iter().collect();
    for entry in &waitlist {
        assert!(!roster.contains(&entry.student_id), "{} both seated and waiting", entry.student_id);
    }
}

// ── Races ────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn last_seat_goes_to_exactly_one() {
    let engine = engine_with_course("CS101", 1).await;

    let mut handles = Vec::new();
    for i in 0..64 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .request_admission(&format!("s{i}"), "CS101", PriorityTier::Medium)
                .await
        }));
    }

    let mut admitted = 0;
    let mut waitlisted = 0;
    for h in handles {
        match h.await.unwrap() {
            Admission::Admitted => admitted += 1,
            Admission::Waitlisted { .. } => waitlisted += 1,
            Admission::Rejected(reason) => panic!("unexpected rejection: {reason}"),
        }
    }

    assert_eq!(admitted, 1);
    assert_eq!(waitlisted, 63);
    assert_consistent(&engine, "CS101").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_duplicate_requests_hold_one_place() {
    let engine = engine_with_course("CS101", 1).await;
    engine.request_admission("seated", "CS101", PriorityTier::Medium).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.request_admission("dup", "CS101", PriorityTier::High).await
        }));
    }
    let outcomes: Vec<Admission> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_waitlisted()).count(), 1);
    assert_eq!(outcomes.iter().filter(|o| o.is_rejected()).count(), 15);
    assert_eq!(engine.get_waitlist("CS101").await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn drops_racing_requests_never_idle_a_seat() {
    let engine = engine_with_course("CS101", 5).await;
    for i in 0..5 {
        assert!(
            engine
                .request_admission(&format!("seat{i}"), "CS101", PriorityTier::Medium)
                .await
                .is_admitted()
        );
    }

    let mut handles = Vec::new();
    for i in 0..5 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.drop_enrollment(&format!("seat{i}"), "CS101").await
        }));
    }
    for i in 0..40 {
        let engine = engine.clone();
        let tier = match i % 3 {
            0 => PriorityTier::High,
            1 => PriorityTier::Medium,
            _ => PriorityTier::Low,
        };
        handles.push(tokio::spawn(async move {
            engine
                .request_admission(&format!("new{i}"), "CS101", tier)
                .await
                .is_rejected()
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let info = engine.get_course("CS101").await.unwrap();
    assert_eq!(info.enrolled, 5);
    assert_eq!(info.waitlisted, 35);
    assert_consistent(&engine, "CS101").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn batch_interleaves_with_single_requests() {
    let engine = engine_with_course("CS101", 10).await;
    let roster: Vec<String> = (0..50).map(|i| format!("batch{i}")).collect();

    let batch = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.process_batch("CS101", &roster).await })
    };
    let mut singles = Vec::new();
    for i in 0..20 {
        let engine = engine.clone();
        singles.push(tokio::spawn(async move {
            engine
                .request_admission(&format!("single{i}"), "CS101", PriorityTier::Medium)
                .await
        }));
    }

    let result = batch.await.unwrap().unwrap();
    let single_admitted = futures::future::join_all(singles)
        .await
        .into_iter()
        .filter(|r| r.as_ref().unwrap().is_admitted())
        .count();

    assert_eq!(result.rejected_count, 0);
    assert_eq!(result.admitted_count + single_admitted, 10);
    assert_eq!(result.admitted_count + result.waitlisted_count, 50);
    assert_consistent(&engine, "CS101").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn capacity_change_races_admissions() {
    let engine = engine_with_course("CS101", 2).await;

    let mut handles = Vec::new();
    for i in 0..30 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .request_admission(&format!("s{i}"), "CS101", PriorityTier::Medium)
                .await;
        }));
    }
    let grow = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.set_capacity("CS101", 12).await })
    };
    for h in handles {
        h.await.unwrap();
    }
    grow.await.unwrap().unwrap();

    let info = engine.get_course("CS101").await.unwrap();
    assert_eq!(info.capacity, 12);
    assert_eq!(info.enrolled, 12);
    assert_eq!(info.waitlisted, 18);
    assert_consistent(&engine, "CS101").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_snapshots_keep_trend_chronological() {
    let engine = engine_with_course("CS101", 10_000).await;

    let mut handles = Vec::new();
    for i in 0..400 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            assert!(
                engine
                    .request_admission(&format!("s{i}"), "CS101", PriorityTier::Medium)
                    .await
                    .is_admitted()
            );
            engine.record_snapshot("CS101").await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let trend = engine.get_trend("CS101");
    assert_eq!(trend.len(), 400);
    let points: Vec<_> = trend.iter().collect();
    for pair in points.windows(2) {
        assert!(
            pair[0].enrolled <= pair[1].enrolled,
            "trend went backwards: {} then {}",
            pair[0].enrolled,
            pair[1].enrolled
        );
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    assert_eq!(trend.latest().map(|s| s.enrolled), Some(400));
}

// ── Journal ──────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn journal_records_every_admission() {
    let dir = std::env::temp_dir().join(format!("seatline_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("journal.bin");

    let engine = Engine::new(Arc::new(InMemoryStudentRecords::new()))
        .with_journal(Journal::spawn(&path).unwrap());
    engine
        .register_course(CourseSpec::new("CS101", "Main Campus", 3))
        .await
        .unwrap();
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for i in 0..10 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .request_admission(&format!("s{i}"), "CS101", PriorityTier::Medium)
                .await
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let events = Journal::read_all(&path).unwrap();
    assert!(matches!(events[0], EnrollmentEvent::CourseRegistered { .. }));
    let admitted = events
        .iter()
        .filter(|e| matches!(e, EnrollmentEvent::Admitted { .. }))
        .count();
    let waitlisted = events
        .iter()
        .filter(|e| matches!(e, EnrollmentEvent::Waitlisted { .. }))
        .count();
    assert_eq!(admitted, 3);
    assert_eq!(waitlisted, 7);

    let _ = std::fs::remove_dir_all(&dir);
}

// ── Catalog ──────────────────────────────────────────────────

#[test]
fn catalog_seeds_a_working_engine() {
    let seed = catalog::parse_catalog(
        r#"{
            "courses": [
                {"id": "CS101", "campus": "Main Campus", "capacity": 1, "prerequisites": ["None"]},
                {"id": "CS301", "campus": "Main Campus", "capacity": 5, "prerequisites": ["CS101", "CS201"]}
            ],
            "students": [
                {"id": "S1", "completed": ["CS101", "CS201"]},
                {"id": "S2", "completed": ["CS101"]}
            ]
        }"#,
    )
    .unwrap();

    tokio_test::block_on(async {
        let engine = Engine::new(Arc::new(seed.student_records()));
        seed.register_all(&engine).await.unwrap();

        let roster = vec!["S1".to_string(), "S2".to_string()];
        let result = engine.process_batch("CS301", &roster).await.unwrap();
        assert_eq!(result.admitted_count, 1);
        assert_eq!(result.rejected_count, 1);
        assert_eq!(result.rejected().map(|(sid, _)| sid).collect::<Vec<_>>(), vec!["S2"]);

        let analytics = engine.course_analytics("CS301").await.unwrap();
        assert_eq!(analytics.total_enrolled, 1);
        assert_eq!(analytics.enrollment_rate, 1.0);
        assert_eq!(analytics.distribution.len(), 2);
    });
}
