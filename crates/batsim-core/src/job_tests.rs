use super::*;

#[test]
fn legal_transitions_succeed() {
    let mut job = Job::builder().build();
    job.transition(JobState::Submitted).unwrap();
    job.transition(JobState::Running).unwrap();
    job.transition(JobState::CompletedSuccessfully).unwrap();
    assert!(job.state.is_terminal());
    assert!(job.state.success());
}

#[test]
fn illegal_transition_is_rejected() {
    let mut job = Job::builder().build();
    let err = job.transition(JobState::Running).unwrap_err();
    assert!(matches!(err, InvariantViolation::IllegalStateTransition { .. }));
}

#[test]
fn rejected_is_terminal_and_not_success() {
    let mut job = Job::builder().build();
    job.transition(JobState::Submitted).unwrap();
    job.transition(JobState::Rejected).unwrap();
    assert!(job.state.is_terminal());
    assert!(!job.state.success());
}

#[test]
fn stretch_uses_epsilon_for_zero_runtime() {
    let mut job = Job::builder().submission_time(0.0).build();
    job.starting_time = Some(0.0);
    job.runtime = Some(0.0);
    let stretch = job.stretch().unwrap();
    assert!((stretch - 0.0 / 1e-5).abs() < 1e-9 || stretch == 0.0);
}

#[test]
fn stretch_normal_case() {
    let mut job = Job::builder().submission_time(0.0).build();
    job.starting_time = Some(5.0);
    job.runtime = Some(10.0);
    // turnaround = finish(15) - submission(0) = 15, stretch = 15/10
    assert!((job.stretch().unwrap() - 1.5).abs() < 1e-9);
}

#[test]
fn walltime_unbounded() {
    assert!(Walltime::UNBOUNDED.is_unbounded());
    assert_eq!(Walltime::UNBOUNDED.seconds(), None);
    assert_eq!(Walltime(30.0).seconds(), Some(30.0));
}

#[test]
fn incoming_message_fifo_order() {
    let mut job = Job::builder().build();
    job.push_incoming_message("first".into());
    job.push_incoming_message("second".into());
    assert_eq!(job.pop_incoming_message().as_deref(), Some("first"));
    assert_eq!(job.pop_incoming_message().as_deref(), Some("second"));
    assert_eq!(job.pop_incoming_message(), None);
}
