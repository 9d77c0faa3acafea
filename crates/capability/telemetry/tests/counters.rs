use upsmon_telemetry::{
    metrics, record_alerts_triggered, record_cycle_completed, record_history_pruned,
};

#[test]
fn counters_accumulate_into_snapshot() {
    let before = metrics().snapshot();
    record_cycle_completed();
    record_cycle_completed();
    record_alerts_triggered(3);
    record_history_pruned(7);
    let after = metrics().snapshot();
    assert_eq!(after.cycles_completed - before.cycles_completed, 2);
    assert_eq!(after.alerts_triggered - before.alerts_triggered, 3);
    assert_eq!(after.history_entries_pruned - before.history_entries_pruned, 7);
}
