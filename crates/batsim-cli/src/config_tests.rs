use super::*;
use clap::Parser;

fn parse(args: &[&str]) -> Args {
    let mut full = vec!["batsim"];
    full.extend_from_slice(args);
    Args::parse_from(full)
}

#[test]
fn requires_exactly_one_edc() {
    let args = parse(&["--platform", "p.json"]);
    assert_eq!(validate(&args), Err(ConfigurationError::NoEdcSelected));

    let args = parse(&["--platform", "p.json", "--library", "a.so", "--socket", "localhost:1"]);
    assert_eq!(validate(&args), Err(ConfigurationError::MultipleEdcsSelected));
}

#[test]
fn mmax_and_mmax_workload_are_mutually_exclusive() {
    let args = parse(&["--platform", "p.json", "--library", "a.so", "--mmax", "4", "--mmax-workload"]);
    assert_eq!(validate(&args), Err(ConfigurationError::ConflictingMmax));
}

#[test]
fn valid_args_produce_a_config() {
    let args = parse(&["--platform", "p.json", "--library", "a.so", "--add-role", "node0", "master"]);
    let config = validate(&args).unwrap();
    assert_eq!(config.roles, vec![("node0".to_string(), Role::Master)]);
    assert!(matches!(config.edc, EdcSelection::Library { path } if path == "a.so"));
}

#[test]
fn unknown_role_is_rejected() {
    let args = parse(&["--platform", "p.json", "--library", "a.so", "--add-role", "node0", "bogus"]);
    assert_eq!(validate(&args), Err(ConfigurationError::UnknownRole { role: "bogus".to_string() }));
}
