use super::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn job_span_and_pstate_span_share_one_stream() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gantt.csv");
    let mut tracer = GanttTracer::create(&path).unwrap();

    let machines: MachineRange = [0u32].into_iter().collect();
    let job_id = JobId::new("w0", "job0");
    tracer.job_span(0.0, &machines, GanttEvent::JobStart, &job_id).unwrap();
    tracer.job_span(10.0, &machines, GanttEvent::JobEnd, &job_id).unwrap();
    tracer.pstate_span(10.0, &machines, 1).unwrap();
    tracer.flush().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "0,0,job_start,w0!job0,");
    assert_eq!(lines[3], "10,0,pstate_change,,1");
}
