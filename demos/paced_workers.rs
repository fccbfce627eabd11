//! Several workers sharing one paced turnstile.
//!
//! Shows pacing, a temporary hard block and the observer's estimates.
//!
//! Run with: cargo run --example paced_workers

use std::sync::Arc;
use std::time::Duration;
use turnstile_gate::{FlowRate, Turnstile};

#[tokio::main]
async fn main() {
    let rate: FlowRate = "50/s".parse().expect("valid rate");
    let turnstile = Arc::new(Turnstile::builder().rate(rate).build());
    turnstile.start().expect("fresh turnstile is paused");

    println!("Target rate: {rate} ({:.1}/s)", rate.volume_per_second());

    let mut workers = Vec::new();
    for worker in 0..4 {
        let turnstile = turnstile.clone();
        workers.push(tokio::spawn(async move {
            for _ in 0..25 {
                let event = turnstile.pass().await;
                if event % 20 == 0 {
                    println!("worker {worker} passed event {event}");
                }
            }
        }));
    }

    // Hold everyone for a moment halfway through.
    tokio::time::sleep(Duration::from_millis(800)).await;
    println!("\nBlocking at {} events...", turnstile.events_seen());
    turnstile.block().await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    turnstile.unblock().await;
    println!("Unblocked.\n");

    for worker in workers {
        worker.await.expect("worker panicked");
    }

    let observer = turnstile.observer();
    println!("Events seen: {}", turnstile.events_seen());
    println!(
        "Adaptive estimate: {:.1}/s",
        observer
            .adaptive_rate()
            .map(|r| r.volume_per_second())
            .unwrap_or_default()
    );
    println!(
        "Last 40 events: {:.1}/s",
        observer.rate_over_events(40).volume_per_second()
    );
    println!(
        "Last second: {:.1}/s",
        observer.rate_over_time(Duration::from_secs(1)).volume_per_second()
    );
}
