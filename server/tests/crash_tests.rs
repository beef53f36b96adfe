use keyward_server::{
    cap_crash_report, CrashReport, CrashSink, FsCrashSink, MAX_CRASH_BYTES, MAX_CRASH_LINES,
};
use keyward_types::{Platform, Version};
use pretty_assertions::assert_eq;

fn report(content: &str) -> CrashReport {
    CrashReport {
        content: content.to_string(),
        os: Platform::MacArm,
        version: Version::new(220905),
        email: None,
    }
}

// ── Capping ──────────────────────────────────────────────────────

#[test]
fn short_report_is_unchanged() {
    let content = "Thread 0 Crashed\n0 app 0x1234\n";
    assert_eq!(cap_crash_report(content), content);
}

#[test]
fn long_report_is_cut_to_byte_limit() {
    let content = "x".repeat(MAX_CRASH_BYTES + 500);
    assert_eq!(cap_crash_report(&content).len(), MAX_CRASH_BYTES);
}

#[test]
fn byte_cut_respects_char_boundaries() {
    // 'é' is two bytes; an odd prefix puts the limit mid-character.
    let content = format!("a{}", "é".repeat(MAX_CRASH_BYTES));
    let capped = cap_crash_report(&content);
    assert!(capped.len() <= MAX_CRASH_BYTES);
    assert_eq!(capped.len(), MAX_CRASH_BYTES - 1);
}

#[test]
fn line_count_is_capped() {
    let content = "l\n".repeat(MAX_CRASH_LINES * 2);
    let capped = cap_crash_report(&content);
    assert_eq!(capped.lines().count(), MAX_CRASH_LINES);
    assert!(!capped.ends_with('\n'));
}

#[test]
fn exactly_the_line_limit_is_kept() {
    let content = "l\n".repeat(MAX_CRASH_LINES - 1) + "last";
    assert_eq!(cap_crash_report(&content), content);
}

// ── Storage ──────────────────────────────────────────────────────

#[test]
fn extension_follows_format() {
    assert_eq!(report(r#"{"app_name":"Keyward"}"#).extension(), "ips");
    assert_eq!(report("Process: Keyward").extension(), "crash");
}

#[tokio::test]
async fn fs_sink_writes_one_file_per_report() {
    let dir = tempfile::tempdir().unwrap();
    let sink = FsCrashSink::new(dir.path().join("nested"));

    let a = sink.store(&report("first")).await.unwrap();
    let b = sink.store(&report(r#"{"app_name":"Keyward"}"#)).await.unwrap();

    assert_ne!(a, b);
    assert!(a.ends_with(".crash"));
    assert!(b.ends_with(".ips"));
    let stored = std::fs::read_to_string(dir.path().join("nested").join(&a)).unwrap();
    assert_eq!(stored, "first");
}
