use super::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn add_pstate_change_uses_hyphen_range_notation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pstate_changes.csv");
    let mut tracer = PstateChangeTracer::create(&path).unwrap();

    let machines: MachineRange = [0u32, 1, 2, 5].into_iter().collect();
    tracer.add_pstate_change(12.5, &machines, 3).unwrap();
    tracer.flush().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next().unwrap(), "time,machine_id_set,new_pstate");
    assert_eq!(lines.next().unwrap(), "12.5,\"0-2,5\",3");
}
