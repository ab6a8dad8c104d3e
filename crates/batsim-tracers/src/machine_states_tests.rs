use super::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn writes_one_row_per_sample() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("machine_states.csv");
    let mut tracer = MachineStateTracer::create(&path).unwrap();

    tracer
        .write_machine_states(0.0, MachineStateCounts { nb_sleeping: 1, nb_s2c: 0, nb_c2s: 0, nb_idle: 2, nb_computing: 3 })
        .unwrap();
    tracer.flush().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next().unwrap(), "time,nb_sleeping,nb_s2c,nb_c2s,nb_idle,nb_computing");
    assert_eq!(lines.next().unwrap(), "0,1,0,0,2,3");
}
