use std::sync::Arc;
use std::time::{Duration, Instant};

use seatline::engine::Engine;
use seatline::model::{CourseSpec, PriorityTier};
use seatline::records::InMemoryStudentRecords;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

fn tier(i: usize) -> PriorityTier {
    match i % 3 {
        0 => PriorityTier::High,
        1 => PriorityTier::Medium,
        _ => PriorityTier::Low,
    }
}

async fn setup(n_courses: usize) -> Arc<Engine> {
    let records = InMemoryStudentRecords::new();
    for s in 0..10_000 {
        records.insert(format!("s{s}"), ["PREREQ"]);
    }
    let engine = Engine::new(Arc::new(records));
    let capacities = [1, 1, 5, 5, 10, 10, 30, 30, 100, 100];
    for c in 0..n_courses {
        let mut spec = CourseSpec::new(format!("C{c}"), "Main Campus", capacities[c % capacities.len()]);
        if c % 2 == 0 {
            spec = spec.prerequisites(["PREREQ"]);
        }
        engine.register_course(spec).await.expect("register failed");
    }
    println!("  registered {n_courses} courses");
    Arc::new(engine)
}

async fn phase1_sequential(engine: &Engine) {
    let n = 5_000;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let t = Instant::now();
        engine
            .request_admission(&format!("s{i}"), "C8", tier(i))
            .await;
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} requests in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("admission latency", &mut latencies);
}

async fn phase2_hot_course(engine: Arc<Engine>) {
    let n_tasks = 32;
    let n_per_task = 200;
    let start = Instant::now();
    let mut handles = Vec::new();

    for t in 0..n_tasks {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let mut latencies = Vec::with_capacity(n_per_task);
            for j in 0..n_per_task {
                let sid = format!("s{}", t * n_per_task + j);
                let started = Instant::now();
                engine.request_admission(&sid, "C0", tier(j)).await;
                latencies.push(started.elapsed());
            }
            latencies
        }));
    }

    let mut all = Vec::new();
    for h in handles {
        all.extend(h.await.expect("task panicked"));
    }
    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task;
    println!(
        "  {n_tasks} tasks x {n_per_task} requests on one course = {total} in {:.2}s = {:.0} ops/sec",
        elapsed.as_secs_f64(),
        total as f64 / elapsed.as_secs_f64()
    );
    print_latency("contended admission latency", &mut all);

    let info = engine.get_course("C0").await.expect("course missing");
    println!("  C0: {}/{} seated, {} waiting", info.enrolled, info.capacity, info.waitlisted);
}

async fn phase3_churn(engine: Arc<Engine>) {
    let n_rounds = 2_000;
    let seated: Vec<String> = engine.get_roster("C8").await.expect("course missing");
    let start = Instant::now();
    let mut latencies = Vec::with_capacity(n_rounds);

    let mut queue = seated;
    for i in 0..n_rounds {
        let Some(student) = queue.pop() else { break };
        let t = Instant::now();
        engine.drop_enrollment(&student, "C8").await;
        latencies.push(t.elapsed());
        if queue.is_empty() {
            queue = engine.get_roster("C8").await.expect("course missing");
        }
        if i % 500 == 0 {
            engine.record_snapshot("C8").await.expect("snapshot failed");
        }
    }

    println!(
        "  {} drops with promotion in {:.2}s",
        latencies.len(),
        start.elapsed().as_secs_f64()
    );
    print_latency("drop + promote latency", &mut latencies);
}

async fn phase4_batches(engine: Arc<Engine>, n_courses: usize) {
    let roster: Vec<String> = (0..500).map(|i| format!("s{i}")).collect();
    let start = Instant::now();
    let mut handles = Vec::new();

    for c in 10..n_courses {
        let engine = engine.clone();
        let roster = roster.clone();
        handles.push(tokio::spawn(async move {
            engine
                .process_batch(&format!("C{c}"), &roster)
                .await
                .expect("batch failed")
        }));
    }

    let mut admitted = 0;
    let mut waitlisted = 0;
    let mut rejected = 0;
    for h in handles {
        let result = h.await.expect("task panicked");
        admitted += result.admitted_count;
        waitlisted += result.waitlisted_count;
        rejected += result.rejected_count;
    }
    println!(
        "  {} batches of {} in {:.2}s: {admitted} admitted, {waitlisted} waitlisted, {rejected} rejected",
        n_courses - 10,
        roster.len(),
        start.elapsed().as_secs_f64()
    );

    let t = Instant::now();
    let distribution = engine.get_course_distribution().await;
    println!(
        "  distribution over {} courses in {:.3}ms, enrollment rate {:.3}",
        distribution.len(),
        t.elapsed().as_secs_f64() * 1000.0,
        engine.get_enrollment_rate().await
    );
}

#[tokio::main]
async fn main() {
    let n_courses = 50;

    println!("=== seatline stress benchmark ===\n");

    println!("[setup]");
    let engine = setup(n_courses).await;

    println!("\n[phase 1] sequential admission throughput");
    phase1_sequential(&engine).await;

    println!("\n[phase 2] contended admissions on a single-seat course");
    phase2_hot_course(engine.clone()).await;

    println!("\n[phase 3] drop churn with waitlist promotion");
    phase3_churn(engine.clone()).await;

    println!("\n[phase 4] concurrent batch imports");
    phase4_batches(engine.clone(), n_courses).await;

    println!("\n=== done ===");
}
