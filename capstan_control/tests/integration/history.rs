//! Cached snapshots and the diagnostic ring buffer.

use capstan_common::consts::HISTORY_LEN;

use super::common::{MockIo, module, unit_params};

#[test]
fn history_is_ordered_and_lossless() {
    let cm = module(unit_params());
    let mut io = MockIo::default();
    let total = 300;
    for i in 0..total {
        io.counts[0] = i as i64 * 10;
        cm.update(i as f64 * 0.001, &mut io).unwrap();
    }

    let history = cm.history();
    assert_eq!(history.len(), HISTORY_LEN);
    for pair in history.windows(2) {
        assert!(pair[1].time > pair[0].time);
        assert_eq!(pair[1].ticks, pair[0].ticks + 1);
        assert!(pair[1].spool_position > pair[0].spool_position);
    }
    let last = history[HISTORY_LEN - 1];
    assert_eq!(last.ticks, total as u64);
    assert_eq!(last, cm.query(false));
}

#[test]
fn cached_query_lags_live_changes() {
    let cm = module(unit_params());
    let mut io = MockIo::default();
    cm.update(0.0, &mut io).unwrap();

    cm.enable();
    assert!(!cm.query(false).enabled);
    assert!(cm.query(true).enabled);

    cm.update(0.001, &mut io).unwrap();
    assert!(cm.query(false).enabled);
}

#[test]
fn short_history_holds_every_tick() {
    let cm = module(unit_params());
    let mut io = MockIo::default();
    for i in 0..5 {
        cm.update(i as f64 * 0.001, &mut io).unwrap();
    }
    let ticks: Vec<u64> = cm.history().iter().map(|q| q.ticks).collect();
    assert_eq!(ticks, vec![1, 2, 3, 4, 5]);
}
