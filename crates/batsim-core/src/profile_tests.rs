use super::*;
use yare::parameterized;

#[parameterized(
    delay_ok = { Profile::Delay { seconds: 1.0, return_code: 0 }, true },
    delay_zero_rejected = { Profile::Delay { seconds: 0.0, return_code: 0 }, false },
    delay_negative_rejected = { Profile::Delay { seconds: -1.0, return_code: 0 }, false },
    sequence_zero_repeat_rejected = {
        Profile::Sequence { repeat: 0, sequence: vec!["a".into()], return_code: 0 }, false
    },
    sequence_empty_rejected = {
        Profile::Sequence { repeat: 1, sequence: vec![], return_code: 0 }, false
    },
    mpi_replay_requires_rank = {
        Profile::MpiReplay { trace_filenames: vec![], return_code: 0 }, false
    },
)]
fn validate_cases(profile: Profile, expect_ok: bool) {
    assert_eq!(profile.validate().is_ok(), expect_ok);
}

#[test]
fn parallel_task_dimension_mismatch_is_rejected() {
    let p = Profile::ParallelTask {
        nb_res: 2,
        cpu_vec: vec![1.0],
        com_mat: vec![0.0, 0.0, 0.0, 0.0],
        return_code: 0,
    };
    assert!(p.validate().is_err());
}

#[test]
fn parallel_task_well_formed_is_accepted() {
    let p = Profile::ParallelTask {
        nb_res: 2,
        cpu_vec: vec![1.0, 1.0],
        com_mat: vec![0.0, 1.0, 1.0, 0.0],
        return_code: 0,
    };
    assert!(p.validate().is_ok());
}

#[test]
fn default_return_code_is_zero_via_serde_default() {
    let json = serde_json::json!({"type": "delay", "seconds": 10.0});
    let p: Profile = serde_json::from_value(json).unwrap();
    assert_eq!(p.return_code(), 0);
}

#[test]
fn kind_names_are_stable() {
    assert_eq!(Profile::Delay { seconds: 1.0, return_code: 0 }.kind(), "delay");
    assert_eq!(
        Profile::DataStaging { bytes: 1.0, from_storage: "a".into(), to_storage: "b".into(), return_code: 0 }
            .kind(),
        "data_staging"
    );
}
