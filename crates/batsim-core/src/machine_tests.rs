use super::*;

#[test]
fn range_string_groups_consecutive_runs() {
    let r = MachineRange::from_ids([0, 1, 2, 3, 7, 9, 10]);
    assert_eq!(r.to_range_string(), "0-3,7,9-10");
}

#[test]
fn range_string_singleton() {
    let r = MachineRange::from_ids([5]);
    assert_eq!(r.to_range_string(), "5");
}

#[test]
fn range_string_empty() {
    assert_eq!(MachineRange::new().to_range_string(), "");
}

#[test]
fn parse_round_trips_with_format() {
    let r = MachineRange::from_ids([0, 1, 2, 3, 7, 9, 10]);
    let parsed = MachineRange::parse(&r.to_range_string()).unwrap();
    assert_eq!(r, parsed);
}

#[test]
fn parse_rejects_inverted_range() {
    assert!(MachineRange::parse("5-2").is_err());
}

#[test]
fn machine_add_remove_job_drives_computing_state() {
    let mut m = Machine::new(MachineId(0), "host0", Role::Compute, 0);
    assert!(!m.is_computing());
    m.add_job(JobId::new("w", "j0"));
    assert!(m.is_computing());
    assert_eq!(m.top_job().unwrap().job_name, "j0");
    m.remove_job(&JobId::new("w", "j0"));
    assert!(!m.is_computing());
    assert!(matches!(m.state, MachineState::Idle));
}

#[test]
fn machine_jobs_being_computed_preserves_insertion_order() {
    let mut m = Machine::new(MachineId(0), "host0", Role::Compute, 0);
    m.add_job(JobId::new("w", "first"));
    m.add_job(JobId::new("w", "second"));
    assert_eq!(m.top_job().unwrap().job_name, "first");
}

#[test]
fn role_round_trips_through_str() {
    assert_eq!("compute_node".parse::<Role>().unwrap(), Role::Compute);
    assert_eq!("storage".parse::<Role>().unwrap(), Role::Storage);
    assert_eq!("master".parse::<Role>().unwrap(), Role::Master);
    assert!("bogus".parse::<Role>().is_err());
}
