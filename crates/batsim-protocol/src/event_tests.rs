use super::*;

#[test]
fn job_completed_round_trips_through_json() {
    let event = OutboundEvent::JobCompleted {
        job_id: "w0!job1".to_string(),
        job_state: "completed_successfully".to_string(),
        return_code: 0,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "job_completed");
    let back: OutboundEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn job_id_wire_uses_canonical_string() {
    let wire = JobIdWire(JobId::new("w0", "job1"));
    let json = serde_json::to_value(&wire).unwrap();
    assert_eq!(json, serde_json::json!("w0!job1"));
}

#[test]
fn resource_state_changed_carries_hyphen_range() {
    let event = OutboundEvent::ResourceStateChanged { machines: "0-3,7".to_string(), new_pstate: 1 };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["machines"], "0-3,7");
}

#[test]
fn inbound_execute_job_round_trips() {
    let event = InboundEvent::ExecuteJob {
        job_id: JobIdWire(JobId::new("w0", "job1")),
        placement: AllocationPlacement::simple([batsim_core::MachineId(1), batsim_core::MachineId(2)]),
    };
    let json = serde_json::to_value(&event).unwrap();
    let back: InboundEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn unknown_event_tag_fails_to_decode() {
    let json = serde_json::json!({"type": "not_a_real_event"});
    let result: Result<InboundEvent, _> = serde_json::from_value(json);
    assert!(result.is_err());
}
