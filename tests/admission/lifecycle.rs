use crawl_admission::admission::CheckState;
use crawl_admission::config::GenerationConfig;
use crawl_admission::engine::CollectorSnapshot;
use crawl_admission::schedule::TriggerAction;

use super::harness::{Harness, at};

fn collector_of(harness: &Harness, prefix: &str) -> Vec<String> {
    harness
        .engine
        .collector_names()
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .collect()
}

#[tokio::test]
async fn a_day_of_triggers_balances_review_and_asin_work() {
    let harness = Harness::new(Vec::new());
    let fire = |action, now| harness.dispatcher.fire(action, now);

    // just after midnight the daily review batch opens
    assert_eq!(fire(TriggerAction::LoadingTasksAtTimePoint, at(0, 0, 10)).await, None);
    assert_eq!(collector_of(&harness, "REVIEW").len(), 1);

    // review work blocks ASIN generation
    let state = fire(TriggerAction::AsinWatchdog, at(0, 6, 0)).await;
    assert_eq!(state, Some(CheckState::still_review_tasks()));
    assert_eq!(harness.asin_submissions(), 0);

    // review drained, nothing pending anywhere
    for name in collector_of(&harness, "REVIEW") {
        harness.engine.set_pending(&name, 0);
    }
    let state = fire(TriggerAction::AsinWatchdog, at(1, 0, 0)).await;
    assert_eq!(state, Some(CheckState::no_any_task()));
    assert_eq!(harness.asin_submissions(), 1);

    // a full ASIN batch is not topped up
    let state = fire(TriggerAction::AsinWatchdog, at(1, 2, 0)).await;
    assert_eq!(state, Some(CheckState::still_other_tasks()));
    assert_eq!(harness.asin_submissions(), 1);

    // nearly drained batch gets topped up
    let asin = collector_of(&harness, "ASIN");
    harness.engine.set_pending(&asin[0], 150);
    let state = fire(TriggerAction::AsinWatchdog, at(1, 4, 0)).await;
    assert_eq!(state, Some(CheckState::few_asins()));
    assert_eq!(harness.asin_submissions(), 2);

    // end of day: ASIN work is cleared and no longer admitted
    assert_eq!(fire(TriggerAction::ClearAsinTasks, at(23, 30, 0)).await, None);
    assert!(collector_of(&harness, "ASIN").is_empty());
    let state = fire(TriggerAction::AsinWatchdog, at(23, 40, 0)).await;
    assert_eq!(state, Some(CheckState::not_runtime()));
    assert_eq!(harness.asin_submissions(), 2);
}

#[tokio::test]
async fn threshold_boundary_is_inclusive() {
    let harness = Harness::new(vec![CollectorSnapshot::new("ASIN-asin-x", 200)]);
    let state = harness
        .dispatcher
        .fire(TriggerAction::AsinWatchdog, at(10, 0, 0))
        .await;
    assert_eq!(state, Some(CheckState::few_asins()));

    let harness = Harness::new(vec![CollectorSnapshot::new("ASIN-asin-x", 201)]);
    let state = harness
        .dispatcher
        .fire(TriggerAction::AsinWatchdog, at(10, 0, 0))
        .await;
    assert_eq!(state, Some(CheckState::still_other_tasks()));
}

#[tokio::test]
async fn pending_review_wins_over_low_asin_count() {
    let harness = Harness::new(vec![
        CollectorSnapshot::new("ASIN-asin-x", 5),
        CollectorSnapshot::new("REVIEW-review-y", 1),
    ]);

    let state = harness
        .dispatcher
        .fire(TriggerAction::AsinWatchdog, at(10, 0, 0))
        .await;

    assert_eq!(state.map(|s| s.code), Some(90));
    assert_eq!(harness.asin_submissions(), 0);
}

#[tokio::test]
async fn disabled_toggle_wins_regardless_of_collectors() {
    let settings = GenerationConfig {
        enabled: false,
        ..GenerationConfig::default()
    };
    let harness = Harness::with_settings(Vec::new(), settings);

    let state = harness
        .dispatcher
        .fire(TriggerAction::AsinWatchdog, at(10, 0, 0))
        .await;

    assert_eq!(state, Some(CheckState::new(100, "disabled")));
    assert!(harness.engine.submissions().is_empty());
}

#[tokio::test]
async fn retirement_keeps_in_window_and_busy_collectors() {
    let harness = Harness::new(vec![
        CollectorSnapshot::new("ASIN-asin-old", 40),
        CollectorSnapshot::new("REVIEW-review-1", 9),
        CollectorSnapshot::new("orphan-empty", 0),
    ]);

    let before = harness
        .dispatcher
        .fire(TriggerAction::RetireStaleCollectors, at(12, 0, 0))
        .await;
    assert_eq!(before, None);
    assert_eq!(
        harness.engine.collector_names(),
        ["ASIN-asin-old", "REVIEW-review-1"]
    );

    harness
        .dispatcher
        .fire(TriggerAction::RetireStaleCollectors, at(23, 50, 0))
        .await;
    assert_eq!(harness.engine.collector_names(), ["REVIEW-review-1"]);
}

#[tokio::test]
async fn drained_hourly_collectors_do_not_accumulate() {
    let harness = Harness::new(Vec::new());

    for hour in 0..24 {
        harness
            .dispatcher
            .fire(TriggerAction::HourlyLoadingTasks, at(hour, 0, 0))
            .await;
    }
    let opened = harness.engine.collector_names();
    assert_eq!(opened.len(), 72);

    // the engine drains every batch, but the hourly tasks stay in their window
    for name in &opened {
        harness.engine.set_pending(name, 0);
    }
    harness
        .dispatcher
        .fire(TriggerAction::RetireStaleCollectors, at(12, 0, 0))
        .await;

    assert!(harness.engine.collector_names().is_empty());
}
