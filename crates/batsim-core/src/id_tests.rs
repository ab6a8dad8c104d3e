use super::*;

#[test]
fn job_id_canonical_form() {
    let id = JobId::new("w0", "job1");
    assert_eq!(id.canonical(), "w0!job1");
    assert_eq!(id.to_string(), "w0!job1");
}

#[test]
fn job_id_parse_round_trips() {
    let parsed = JobId::parse("dyn!generated_3").unwrap();
    assert_eq!(parsed.workload.0, "dyn");
    assert_eq!(parsed.job_name, "generated_3");
}

#[test]
fn job_id_parse_rejects_missing_bang() {
    assert!(JobId::parse("no-separator").is_none());
}

#[test]
fn job_id_ordering_is_lexical_on_canonical_string() {
    let a = JobId::new("a", "z");
    let b = JobId::new("b", "a");
    assert!(a < b);
}

#[test]
fn job_id_equality_requires_both_fields() {
    assert_eq!(JobId::new("w", "j"), JobId::new("w", "j"));
    assert_ne!(JobId::new("w", "j"), JobId::new("w", "k"));
}

#[test]
fn validate_identifier_rejects_bang() {
    assert!(validate_identifier("workload_name", "has!bang").is_err());
    assert!(validate_identifier("workload_name", "clean").is_ok());
}
