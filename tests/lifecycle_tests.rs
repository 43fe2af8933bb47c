//! End-to-end session lifecycle against a scripted stand-in for `xcrun`.

#![cfg(unix)]

use ios_trace_studio::preflight::{Device, StaticInventory};
use ios_trace_studio::session::SessionStatus;
use ios_trace_studio::supervisor::{AnalyzeTarget, Profiler, StartRequest};
use ios_trace_studio::utils::config::ProfilerConfig;
use ios_trace_studio::utils::ProfilerError;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Records until SIGINT, then writes a small bundle at --output.
/// SLOW_FINALIZE keeps appending to the bundle for about a second;
/// NEVER_FINALIZE exits without writing one.
/// Export prints a fixture chosen by the table schema in the xpath.
const FAKE_XCRUN: &str = r#"#!/bin/sh
if [ "$1" = "xctrace" ] && [ "$2" = "record" ]; then
  out=""
  while [ $# -gt 0 ]; do
    if [ "$1" = "--output" ]; then out="$2"; fi
    shift
  done
  finalize() {
    if [ -n "$NEVER_FINALIZE" ]; then exit 0; fi
    mkdir -p "$out"
    printf "run-data-0123456789" > "$out/Trace1.run"
    if [ -n "$SLOW_FINALIZE" ]; then
      i=0
      while [ $i -lt 10 ]; do
        sleep 0.1
        printf "0123456789" >> "$out/Trace1.run"
        i=$((i + 1))
      done
    fi
    exit 0
  }
  trap finalize INT
  while true; do sleep 0.05; done
fi

if [ "$1" = "xctrace" ] && [ "$2" = "export" ]; then
  case "$6" in
    *time-profile*)
      cat <<'EOF'
<trace-query-result><node>
<row><symbol>-[FeedViewController reload]</symbol><self-time>30</self-time><total-time>75</total-time></row>
<row><symbol>objc_msgSend</symbol><self-time>25</self-time><total-time>25</total-time></row>
</node></trace-query-result>
EOF
      ;;
    *allocations*)
      if [ -n "$FAIL_ALLOCATIONS" ]; then
        echo "table not found" >&2
        exit 2
      fi
      cat <<'EOF'
<trace-query-result><node>
<row><category>Malloc 32 Bytes</category><size>2097152</size><count>64</count></row>
</node></trace-query-result>
EOF
      ;;
    *leaks*)
      printf 'Process 77: 1 leak for 48 total leaked bytes.\n\nLeak: 0x600000c01230  size=48\n\tNSObject  ObjC  libobjc.A.dylib\n'
      ;;
  esac
  exit 0
fi

exit 1
"#;

/// `flag` is set to 1 at the top of the script, e.g. `FAIL_ALLOCATIONS`
fn write_fake_xcrun(dir: &Path, flag: Option<&str>) -> PathBuf {
    let path = dir.join("xcrun");
    let script = match flag {
        Some(flag) => FAKE_XCRUN.replacen("#!/bin/sh\n", &format!("#!/bin/sh\n{}=1\n", flag), 1),
        None => FAKE_XCRUN.to_string(),
    };
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn profiler(dir: &Path, flag: Option<&str>) -> Profiler<StaticInventory> {
    profiler_with(dir, flag, Duration::from_millis(50), Duration::from_secs(10))
}

fn profiler_with(
    dir: &Path,
    flag: Option<&str>,
    poll_interval: Duration,
    finalize_timeout: Duration,
) -> Profiler<StaticInventory> {
    let config = ProfilerConfig::new()
        .with_xcrun(write_fake_xcrun(dir, flag))
        .with_trace_root(dir.join("traces"))
        .with_poll_interval(poll_interval)
        .with_finalize_timeout(finalize_timeout);
    let inventory = StaticInventory::new(vec![
        Device {
            udid: "D1".to_string(),
            name: "iPhone 15".to_string(),
            state: "Booted".to_string(),
            runtime: "iOS 17.0".to_string(),
        },
        Device {
            udid: "D2".to_string(),
            name: "iPad Air".to_string(),
            state: "Shutdown".to_string(),
            runtime: "iOS 17.0".to_string(),
        },
    ]);
    Profiler::new(config, inventory)
}

fn start_request(udid: &str) -> StartRequest {
    StartRequest {
        device_udid: udid.to_string(),
        bundle_id: "com.example.Feed".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_start_stop_analyze() {
    let dir = tempfile::tempdir().unwrap();
    let profiler = profiler(dir.path(), None);

    let started = profiler.start(start_request("D1")).await.unwrap();
    assert_eq!(started.status, SessionStatus::Recording);
    assert!(started.pid > 0);
    assert!(started.trace_path.ends_with("recording.trace"));
    assert_eq!(
        profiler.store().get_session(&started.session_id).unwrap().status,
        SessionStatus::Recording
    );

    // Let the recorder install its signal handler
    tokio::time::sleep(Duration::from_millis(300)).await;

    let stopped = profiler.stop(&started.session_id).await.unwrap();
    assert_eq!(stopped.status, SessionStatus::Completed);
    assert!(stopped.file_size_mb > 0.0);
    assert!(stopped.duration_seconds > 0.0);

    let result = profiler
        .analyze(AnalyzeTarget::Session(started.session_id.clone()), None)
        .await
        .unwrap();

    assert_eq!(
        result.summary.templates_analyzed,
        vec!["Time Profiler", "Allocations", "Leaks"]
    );
    assert_eq!(result.summary.session_id.as_deref(), Some(started.session_id.as_str()));
    assert!(!result.summary.partial);

    let cpu = result.time_profiler.unwrap();
    assert_eq!(cpu.heaviest_stack_trace, "-[FeedViewController reload]");
    assert_eq!(cpu.top_symbols[0].percentage, 75.0);
    assert_eq!(result.allocations.unwrap().peak_memory_mb, 2.0);
    assert_eq!(result.leaks.unwrap().leak_count, 1);

    assert!(!profiler.store().has_session(&started.session_id));
}

#[tokio::test]
async fn test_stop_unknown_session() {
    let dir = tempfile::tempdir().unwrap();
    let profiler = profiler(dir.path(), None);

    let err = profiler.stop("session-missing").await.unwrap_err();
    assert_eq!(err.code(), "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_start_on_shutdown_device() {
    let dir = tempfile::tempdir().unwrap();
    let profiler = profiler(dir.path(), None);

    let err = profiler.start(start_request("D2")).await.unwrap_err();

    assert!(matches!(err, ProfilerError::DeviceNotReady { .. }));
    assert!(err.to_tool_error().hint.is_some());
    assert_eq!(profiler.store().session_count(), 0);
    assert!(!dir.path().join("traces").exists());
}

#[tokio::test]
async fn test_analyze_trace_path_with_failed_export() {
    let dir = tempfile::tempdir().unwrap();
    let profiler = profiler(dir.path(), Some("FAIL_ALLOCATIONS"));
    let bundle = dir.path().join("manual.trace");
    std::fs::create_dir_all(&bundle).unwrap();
    std::fs::write(bundle.join("Trace1.run"), b"data").unwrap();

    let result = profiler
        .analyze(
            AnalyzeTarget::TracePath(bundle),
            Some(vec!["alloc".to_string(), "leaks".to_string(), "energy".to_string()]),
        )
        .await
        .unwrap();

    assert_eq!(result.summary.templates_analyzed, vec!["Allocations", "Leaks"]);
    assert!(result.summary.session_id.is_none());
    assert!(result.summary.partial);
    assert!(result.allocations.unwrap().partial);
    assert!(!result.leaks.unwrap().partial);
    assert!(result.time_profiler.is_none());
    assert!(result.summary.warnings.iter().any(|w| w.contains("energy")));
    assert!(result.summary.warnings.iter().any(|w| w.contains("Allocations")));
}

#[tokio::test]
async fn test_shutdown_interrupts_recorders() {
    let dir = tempfile::tempdir().unwrap();
    let profiler = profiler(dir.path(), None);

    let started = profiler.start(start_request("D1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(profiler.shutdown(), 1);
    assert_eq!(profiler.store().session_count(), 0);
    assert!(profiler.list_sessions().is_empty());

    // The interrupted recorder still finalizes its bundle
    let mut waited = Duration::ZERO;
    while !started.trace_path.exists() && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        waited += Duration::from_millis(50);
    }
    assert!(started.trace_path.exists());
}

#[tokio::test]
async fn test_analyze_while_finalizing_is_busy() {
    let dir = tempfile::tempdir().unwrap();
    // Polls slower than the recorder appends, so the bundle keeps growing
    let profiler = profiler_with(
        dir.path(),
        Some("SLOW_FINALIZE"),
        Duration::from_millis(200),
        Duration::from_secs(10),
    );

    let started = profiler.start(start_request("D1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let id = started.session_id.clone();
    let (stopped, during) = tokio::join!(profiler.stop(&id), async {
        tokio::time::sleep(Duration::from_millis(350)).await;
        let session = profiler.store().get_session(&id).unwrap();
        let analyzed = profiler
            .analyze(AnalyzeTarget::Session(id.clone()), None)
            .await;
        (session, analyzed)
    });

    let (session, analyzed) = during;
    assert_eq!(session.status, SessionStatus::Stopped);
    assert!(session.finalizing);
    assert!(session.end_time.is_some());
    let err = analyzed.unwrap_err();
    assert_eq!(err.code(), "SESSION_BUSY");
    assert!(err.to_tool_error().hint.is_some());

    let stopped = stopped.unwrap();
    assert_eq!(stopped.status, SessionStatus::Completed);
    assert!(profiler.store().has_session(&id));

    // The end time is the signal time, not the moment the bundle settled
    let settled = profiler.store().get_session(&id).unwrap();
    assert!(!settled.finalizing);
    assert_eq!(settled.end_time, session.end_time);

    let result = profiler
        .analyze(AnalyzeTarget::Session(id.clone()), None)
        .await
        .unwrap();
    assert!(!result.summary.partial);
    assert!(!profiler.store().has_session(&id));
}

#[tokio::test]
async fn test_finalize_timeout_marks_failed_and_keeps_session() {
    let dir = tempfile::tempdir().unwrap();
    let profiler = profiler_with(
        dir.path(),
        Some("NEVER_FINALIZE"),
        Duration::from_millis(50),
        Duration::from_secs(1),
    );

    let started = profiler.start(start_request("D1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let err = profiler.stop(&started.session_id).await.unwrap_err();
    assert_eq!(err.code(), "FINALIZE_TIMEOUT");
    assert!(err.to_tool_error().hint.is_some());

    let session = profiler.store().get_session(&started.session_id).unwrap();
    assert_eq!(session.status, SessionStatus::Failed);
    assert!(!session.finalizing);
    assert!(session.end_time.is_some());

    // A bundle that shows up late can still be analyzed
    std::fs::create_dir_all(&started.trace_path).unwrap();
    std::fs::write(started.trace_path.join("Trace1.run"), b"late-bundle").unwrap();

    let result = profiler
        .analyze(AnalyzeTarget::Session(started.session_id.clone()), None)
        .await
        .unwrap();
    assert_eq!(result.summary.templates_analyzed.len(), 3);
    assert!(!profiler.store().has_session(&started.session_id));
}
