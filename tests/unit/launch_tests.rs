use super::*;

#[test]
fn launch_defaults_point_at_the_local_backend() {
    let options = LaunchOptions::try_parse_from(["researcher-tui"]).expect("parse");
    assert_eq!(options.server, "http://127.0.0.1:8000");
    assert_eq!(options.export_dir, PathBuf::from("."));
    assert_eq!(options.topic, None);
}

#[test]
fn launch_accepts_server_export_dir_and_topic() {
    let options = LaunchOptions::try_parse_from([
        "researcher-tui",
        "--server",
        "http://research.internal:9000",
        "--export-dir",
        "/tmp/reports",
        "Quantum Computing",
    ])
    .expect("parse");
    assert_eq!(options.server, "http://research.internal:9000");
    assert_eq!(options.export_dir, PathBuf::from("/tmp/reports"));
    assert_eq!(options.topic.as_deref(), Some("Quantum Computing"));
}

#[test]
fn launch_rejects_unknown_flags() {
    assert!(LaunchOptions::try_parse_from(["researcher-tui", "--bogus"]).is_err());
}
