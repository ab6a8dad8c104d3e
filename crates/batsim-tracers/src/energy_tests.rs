use super::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn first_entry_has_no_epower() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("consumed_energy.csv");
    let mut tracer = EnergyConsumptionTracer::create(&path, 100.0).unwrap();

    tracer.add_entry(0.0, EnergyEvent::JobStart, 50.0).unwrap();
    tracer.flush().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let row = content.lines().nth(1).unwrap();
    assert_eq!(row, "0,0,s,100,NA");
}

#[test]
fn energy_integrates_previous_epower_over_elapsed_time() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("consumed_energy.csv");
    let mut tracer = EnergyConsumptionTracer::create(&path, 100.0).unwrap();

    tracer.add_entry(0.0, EnergyEvent::JobStart, 50.0).unwrap();
    let energy = tracer.add_entry(10.0, EnergyEvent::JobEnd, 80.0).unwrap();

    // 50W held for 10s between the two entries.
    assert_eq!(energy, 500.0);
}

#[test]
fn consumed_joules_is_the_first_to_last_delta() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("consumed_energy.csv");
    let mut tracer = EnergyConsumptionTracer::create(&path, 100.0).unwrap();

    tracer.add_entry(0.0, EnergyEvent::JobStart, 50.0).unwrap();
    tracer.add_entry(10.0, EnergyEvent::JobEnd, 80.0).unwrap();
    tracer.add_entry(20.0, EnergyEvent::JobStart, 80.0).unwrap();
    tracer.add_entry(30.0, EnergyEvent::JobEnd, 80.0).unwrap();

    // first_submission energy snapshot is 0 (taken at the very first JobStart);
    // last completion is whatever energy had accrued by the final JobEnd.
    assert_eq!(tracer.consumed_joules(), tracer.last_entry_energy);
}
