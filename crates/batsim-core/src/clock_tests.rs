use super::*;

#[test]
fn sim_time_orders_like_f64() {
    assert!(SimTime::seconds(1.0) < SimTime::seconds(2.0));
    assert_eq!(SimTime::ZERO, SimTime::seconds(0.0));
}

#[test]
fn millis_round_trip() {
    let t = SimTime::from_millis(1500);
    assert_eq!(t.as_millis(), 1500);
    assert!((t.as_f64() - 1.5).abs() < 1e-9);
}

#[test]
fn fake_clock_advances_monotonically() {
    let clock = FakeClock::new();
    assert_eq!(clock.now(), SimTime::ZERO);
    clock.advance_to(SimTime::seconds(5.0));
    assert_eq!(clock.now(), SimTime::seconds(5.0));
}
