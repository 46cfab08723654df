//! Tests for TimerTask firing, cancellation and lifecycle
//!
//! Async tests run on a paused clock unless noted, so sleeps advance virtual
//! time and fire counts are exact.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::{Instant, sleep};

use super::{FaultPolicy, RunExit, TimerError, TimerTask, period_from_millis};
use crate::signal::{CancelSignal, CancelSource};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Timer whose action bumps the returned counter
fn counting_timer() -> (TimerTask, Arc<AtomicU64>) {
    let count = Arc::new(AtomicU64::new(0));
    let c = Arc::clone(&count);
    let timer = TimerTask::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    (timer, count)
}

#[tokio::test(start_paused = true)]
async fn test_one_shot_fires_once_after_period() {
    let (timer, count) = counting_timer();
    let started = Instant::now();

    let report = timer.start_async(ms(100), false).await.unwrap();

    assert!(started.elapsed() >= ms(100));
    assert_eq!(report.fires, 1);
    assert_eq!(report.exit, RunExit::Completed);
    assert!(!report.was_cancelled());
    assert_eq!(count.load(Ordering::SeqCst), 1);

    sleep(ms(1000)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1, "one-shot must never fire again");
}

#[tokio::test(start_paused = true)]
async fn test_zero_period_one_shot_fires_immediately() {
    let (timer, count) = counting_timer();

    let report = timer.start_one_shot(Duration::ZERO).await.unwrap();

    assert_eq!(report.exit, RunExit::Completed);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_stop_freezes_fire_count() {
    let (timer, count) = counting_timer();
    let timer = Arc::new(timer);

    let handle = timer.spawn(ms(50), true).unwrap();
    sleep(ms(175)).await;
    timer.stop();

    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.fires, 3, "fires at 50, 100 and 150ms");
    assert_eq!(report.exit, RunExit::Cancelled(CancelSource::Local));

    sleep(ms(500)).await;
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stop_does_not_affect_sibling_sharing_system_signal() {
    let system = CancelSignal::new();
    let (a, a_count) = counting_timer();
    let (b, b_count) = counting_timer();
    let a = Arc::new(a.with_signal(system.clone()));
    let b = Arc::new(b.with_signal(system.clone()));

    let a_run = a.spawn(ms(50), true).unwrap();
    let b_run = b.spawn(ms(50), true).unwrap();

    sleep(ms(120)).await;
    a.stop();
    sleep(ms(200)).await;

    assert!(!system.is_cancelled());
    assert!(!a.is_running());
    assert!(b.is_running());

    system.cancel();

    let a_report = a_run.await.unwrap().unwrap();
    let b_report = b_run.await.unwrap().unwrap();
    assert_eq!(a_report.exit, RunExit::Cancelled(CancelSource::Local));
    assert_eq!(b_report.exit, RunExit::Cancelled(CancelSource::System));
    assert_eq!(a_count.load(Ordering::SeqCst), 2);
    assert_eq!(b_count.load(Ordering::SeqCst), 6);
}

#[tokio::test(start_paused = true)]
async fn test_system_signal_halts_every_running_timer() {
    let system = CancelSignal::new();
    let (one_shot, one_shot_count) = counting_timer();
    let (periodic, periodic_count) = counting_timer();
    let one_shot = Arc::new(one_shot.with_signal(system.clone()));
    let periodic = Arc::new(periodic.with_signal(system.clone()));

    let one_shot_run = one_shot.spawn(ms(500), false).unwrap();
    let periodic_run = periodic.spawn(ms(50), true).unwrap();

    sleep(ms(75)).await;
    system.cancel();

    let one_shot_report = one_shot_run.await.unwrap().unwrap();
    let periodic_report = periodic_run.await.unwrap().unwrap();
    assert_eq!(one_shot_report.exit, RunExit::Cancelled(CancelSource::System));
    assert_eq!(periodic_report.exit, RunExit::Cancelled(CancelSource::System));
    assert_eq!(one_shot_count.load(Ordering::SeqCst), 0);
    assert_eq!(periodic_count.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tripped_system_signal_cancels_before_first_wait() {
    let system = CancelSignal::new();
    let (a, a_count) = counting_timer();
    let (b, b_count) = counting_timer();
    let a = a.with_signal(system.clone());
    let b = b.with_signal(system.clone());

    system.cancel();
    let started = Instant::now();

    let a_report = a.start_async(ms(100), false).await.unwrap();
    let b_report = b.start_async(ms(100), true).await.unwrap();

    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(a_report.exit, RunExit::Cancelled(CancelSource::System));
    assert_eq!(b_report.exit, RunExit::Cancelled(CancelSource::System));
    assert_eq!(a_count.load(Ordering::SeqCst) + b_count.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_interrupts_wait_promptly() {
    let (timer, count) = counting_timer();
    let timer = Arc::new(timer);
    let started = Instant::now();

    let handle = timer.spawn(Duration::from_secs(10), false).unwrap();
    sleep(ms(100)).await;
    timer.dispose();

    let report = handle.await.unwrap().unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(report.exit, RunExit::Cancelled(CancelSource::Local));
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(timer.is_disposed());
}

#[tokio::test(start_paused = true)]
async fn test_start_after_dispose_fails() {
    let (timer, count) = counting_timer();
    timer.dispose();

    let result = timer.start_async(ms(10), false).await;

    assert!(matches!(result, Err(TimerError::Disposed)));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stop_and_dispose_before_start_are_noops() {
    let (timer, _count) = counting_timer();

    timer.stop();
    timer.stop();
    assert!(!timer.is_running());
    assert!(!timer.is_disposed());

    timer.dispose();
    timer.dispose();
    timer.stop();
    assert!(timer.is_disposed());
    assert!(!timer.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop_runs_fresh_sequence() {
    let (timer, count) = counting_timer();
    let timer = Arc::new(timer);

    let first = timer.spawn(ms(50), true).unwrap();
    sleep(ms(75)).await;
    timer.stop();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first.fires, 1);

    let second = timer.spawn(ms(50), true).unwrap();
    sleep(ms(120)).await;
    assert!(timer.is_running(), "old stop must not leak into the new run");
    timer.stop();
    let second = second.await.unwrap().unwrap();

    assert_eq!(second.fires, 2);
    assert_eq!(second.exit, RunExit::Cancelled(CancelSource::Local));
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_completion() {
    let (timer, count) = counting_timer();

    timer.start_one_shot(ms(10)).await.unwrap();
    timer.start_one_shot(ms(10)).await.unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_is_running_tracks_run_lifetime() {
    let (timer, _count) = counting_timer();
    let timer = Arc::new(timer);

    let handle = timer.spawn(ms(100), false).unwrap();
    sleep(ms(10)).await;
    assert!(timer.is_running());

    handle.await.unwrap().unwrap();
    assert!(!timer.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_is_running_right_after_spawn() {
    let (timer, _count) = counting_timer();
    let timer = Arc::new(timer);

    let handle = timer.spawn(ms(100), false).unwrap();
    assert!(timer.is_running(), "an armed run counts before its first poll");

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
    assert!(!timer.is_running(), "an aborted run must release its slot");
}

#[tokio::test(start_paused = true)]
async fn test_stop_immediately_after_spawn_is_not_lost() {
    let (timer, count) = counting_timer();
    let timer = Arc::new(timer);

    let handle = timer.spawn(ms(50), true).unwrap();
    timer.stop();

    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.fires, 0);
    assert_eq!(report.exit, RunExit::Cancelled(CancelSource::Local));
    assert!(report.was_cancelled());

    sleep(ms(200)).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

// Real clock: a zero-period loop never lets a paused clock auto-advance
#[tokio::test]
async fn test_zero_period_periodic_fires_until_stopped() {
    let (timer, count) = counting_timer();
    let timer = Arc::new(timer.named("busy"));

    let handle = timer.spawn(Duration::ZERO, true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while count.load(Ordering::SeqCst) < 3 {
            sleep(ms(1)).await;
        }
    })
    .await
    .expect("zero-period timer should keep firing");
    timer.stop();

    let report = handle.await.unwrap().unwrap();
    assert!(report.fires >= 3);
    assert_eq!(report.exit, RunExit::Cancelled(CancelSource::Local));
    assert_eq!(count.load(Ordering::SeqCst), report.fires);
    assert_eq!(timer.name(), "busy");
}

#[test]
fn test_period_from_millis() {
    assert_eq!(period_from_millis(250).unwrap(), ms(250));
    assert_eq!(period_from_millis(0).unwrap(), Duration::ZERO);
    assert!(matches!(
        period_from_millis(-1),
        Err(TimerError::InvalidArgument { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_faults_are_logged_and_schedule_continues() {
    let count = Arc::new(AtomicU64::new(0));
    let c = Arc::clone(&count);
    let timer = Arc::new(TimerTask::fallible(move || {
        let n = c.fetch_add(1, Ordering::SeqCst) + 1;
        if n == 2 { Err("second fire failed") } else { Ok(()) }
    }));

    let handle = timer.spawn(ms(10), true).unwrap();
    sleep(ms(55)).await;
    timer.stop();

    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.fires, 5);
    assert_eq!(report.faults, 1);
}

#[tokio::test(start_paused = true)]
async fn test_propagate_policy_ends_run_on_first_fault() {
    let count = Arc::new(AtomicU64::new(0));
    let c = Arc::clone(&count);
    let timer = TimerTask::fallible(move || {
        let n = c.fetch_add(1, Ordering::SeqCst) + 1;
        if n == 2 { Err("boom") } else { Ok(()) }
    })
    .with_fault_policy(FaultPolicy::Propagate);

    let result = timer.start_periodic(ms(10)).await;

    match result {
        Err(TimerError::ActionFault { fire, reason }) => {
            assert_eq!(fire, 2);
            assert_eq!(reason, "boom");
        }
        other => panic!("expected ActionFault, got {other:?}"),
    }
    assert!(!timer.is_running());

    sleep(ms(100)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2, "no fires after the fault");
}

#[tokio::test(start_paused = true)]
async fn test_panicking_action_is_reported_as_fault() {
    let timer = TimerTask::new(|| panic!("kaboom")).with_fault_policy(FaultPolicy::Propagate);

    let result = timer.start_one_shot(ms(10)).await;

    match result {
        Err(TimerError::ActionFault { fire, reason }) => {
            assert_eq!(fire, 1);
            assert!(reason.contains("kaboom"), "unexpected reason: {reason}");
        }
        other => panic!("expected ActionFault, got {other:?}"),
    }
}

#[test]
fn test_drop_trips_local_signal_but_not_system_signal() {
    let system = CancelSignal::new();
    let (timer, _count) = counting_timer();
    let timer = timer.with_signal(system.clone());

    drop(timer);

    assert!(!system.is_cancelled());
}
