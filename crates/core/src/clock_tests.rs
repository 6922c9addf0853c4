// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let start = clock.now();
    let start_ms = clock.epoch_ms();

    clock.advance(Duration::from_secs(5));

    assert_eq!(clock.now() - start, Duration::from_secs(5));
    assert_eq!(clock.epoch_ms() - start_ms, 5_000);
}

#[test]
fn fake_clock_now_utc_tracks_epoch_ms() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    assert_eq!(clock.now_utc().timestamp_millis(), 1_700_000_000_000);

    clock.advance(Duration::from_millis(1_500));
    assert_eq!(clock.now_utc().timestamp_millis(), 1_700_000_001_500);
}

#[test]
fn system_clock_is_monotonic() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}
