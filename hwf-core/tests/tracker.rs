#[path = "../../hwf-net/tests/common/mod.rs"]
mod common;

use std::fs;
use std::path::Path;
use std::time::Duration;

use common::{Reply, TestServer};
use hwf_common::{Config, HwfError, Release};
use hwf_core::{SourceDescriptor, ToolOutcome, Tracker};
use hwf_net::HttpOptions;

fn tracker_in(dir: &Path, max_retries: u32) -> Tracker {
    let config = Config::with_download_dir(dir.join("tool"))
        .max_retries(max_retries)
        .backoff_base(Duration::from_millis(1));
    config.ensure_layout().unwrap();
    let mut http = HttpOptions::from_config(&config);
    http.use_system_proxy = false;
    http.timeout = Duration::from_secs(5);
    Tracker::new(config).with_http_options(http)
}

fn ledger_text(tracker: &Tracker) -> String {
    fs::read_to_string(tracker.config().ledger_path()).unwrap()
}

#[tokio::test]
async fn first_download_then_update_archives_the_old_artifact() {
    let server = TestServer::start(vec![("/a.zip", vec![Reply::ok("tool-a 1.0")])]).await;
    let tmp = tempfile::tempdir().unwrap();
    let tracker = tracker_in(tmp.path(), 5);
    let config = tracker.config().clone();

    let first = Release::new("ToolA", "1.0", server.url("/a.zip"), "a.zip");
    assert!(tracker.ledger().needs_download("ToolA", "1.0"));
    let outcome = tracker.check_release(&first, None).await.unwrap();
    assert!(matches!(
        outcome,
        ToolOutcome::Updated { previous: None, ref version, bytes: 10, .. } if version == "1.0"
    ));
    assert_eq!(ledger_text(&tracker), "ToolA = 1.0\n");
    assert_eq!(
        fs::read_to_string(config.active_artifact_path("a.zip")).unwrap(),
        "tool-a 1.0"
    );
    assert_eq!(fs::read_dir(config.history_dir()).unwrap().count(), 0);

    server.set_route("/a.zip", vec![Reply::ok("tool-a 1.1")]);
    let second = Release::new("ToolA", "1.1", server.url("/a.zip"), "a.zip");
    let outcome = tracker.check_release(&second, None).await.unwrap();
    assert!(matches!(
        outcome,
        ToolOutcome::Updated { previous: Some(ref old), .. } if old == "1.0"
    ));
    assert_eq!(
        fs::read_to_string(config.history_dir().join("a.zip")).unwrap(),
        "tool-a 1.0"
    );
    assert_eq!(
        fs::read_to_string(config.active_artifact_path("a.zip")).unwrap(),
        "tool-a 1.1"
    );
    assert_eq!(ledger_text(&tracker), "ToolA = 1.1\n");

    let outcome = tracker.check_release(&second, None).await.unwrap();
    assert_eq!(
        outcome,
        ToolOutcome::UpToDate {
            version: "1.1".to_string()
        }
    );
    assert_eq!(server.hits("/a.zip"), 1);
}

#[tokio::test]
async fn failed_download_leaves_the_ledger_alone() {
    let server = TestServer::start(vec![("/a.zip", vec![Reply::status(500)])]).await;
    let tmp = tempfile::tempdir().unwrap();
    let tracker = tracker_in(tmp.path(), 2);
    tracker.ledger().record_version("ToolB", "0.9").unwrap();

    let release = Release::new("ToolA", "1.0", server.url("/a.zip"), "a.zip");
    let err = tracker.check_release(&release, None).await.unwrap_err();

    match err {
        HwfError::DownloadError(name, url, reason) => {
            assert_eq!(name, "ToolA");
            assert_eq!(url, server.url("/a.zip"));
            assert!(reason.contains("after 3 attempts"), "{reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(server.hits("/a.zip"), 3);
    assert_eq!(ledger_text(&tracker), "ToolB = 0.9\n");
    assert!(!tracker.config().active_artifact_path("a.zip").exists());
    assert!(tracker.ledger().needs_download("ToolA", "1.0"));
}

#[tokio::test]
async fn sources_are_scraped_resolved_and_downloaded() {
    let server = TestServer::start(vec![
        ("/7zip/", vec![Reply::ok("<a>Download 7-Zip 24.09</a>")]),
        ("/a/7z2409-x64.exe", vec![Reply::ok("MZ 24.09")]),
    ])
    .await;
    let tmp = tempfile::tempdir().unwrap();
    let tracker = tracker_in(tmp.path(), 1);
    let source = SourceDescriptor::new(
        "7-ZIP",
        &server.url("/7zip/"),
        r"Download 7-Zip (\d+\.\d+)",
        &server.url("/a/7z{version_compact}-x64.exe"),
        Some("7z-x64.exe"),
    );

    let outcome = tracker.check_source(&source).await.unwrap();

    assert!(matches!(outcome, ToolOutcome::Updated { bytes: 8, .. }));
    assert_eq!(ledger_text(&tracker), "7-ZIP = 24.09\n");
    assert_eq!(
        fs::read_to_string(tracker.config().active_artifact_path("7z-x64.exe")).unwrap(),
        "MZ 24.09"
    );
}

#[tokio::test]
async fn version_named_artifacts_archive_the_previous_file() {
    let server = TestServer::start(vec![
        ("/page", vec![Reply::ok("release v2")]),
        ("/files/tool-2.zip", vec![Reply::ok("two")]),
    ])
    .await;
    let tmp = tempfile::tempdir().unwrap();
    let tracker = tracker_in(tmp.path(), 1);
    let config = tracker.config().clone();
    tracker.ledger().record_version("ToolC", "1").unwrap();
    fs::write(config.active_artifact_path("tool-1.zip"), "one").unwrap();

    let source = SourceDescriptor::new(
        "ToolC",
        &server.url("/page"),
        r"release v(\d+)",
        &server.url("/files/tool-{version}.zip"),
        None,
    );
    tracker.check_source(&source).await.unwrap();

    assert!(!config.active_artifact_path("tool-1.zip").exists());
    assert_eq!(
        fs::read_to_string(config.history_dir().join("tool-1.zip")).unwrap(),
        "one"
    );
    assert_eq!(
        fs::read_to_string(config.active_artifact_path("tool-2.zip")).unwrap(),
        "two"
    );
    assert_eq!(ledger_text(&tracker), "ToolC = 2\n");
}

fn failing_and_working_sources(server: &TestServer) -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::new(
            "HWINFO",
            &server.url("/hwinfo/"),
            r"<sub>Version ([\d\.]+)</sub>",
            &server.url("/hwi_{version_compact}.zip"),
            Some("hwinfo.zip"),
        ),
        SourceDescriptor::new(
            "CPU-Z",
            &server.url("/cpu-z.html"),
            r"Version (\d+\.\d+)",
            &server.url("/cpu-z_{version}-cn.exe"),
            Some("cpu-z-cn.exe"),
        ),
    ]
}

#[tokio::test]
async fn one_broken_vendor_page_does_not_block_the_others() {
    let server = TestServer::start(vec![
        ("/hwinfo/", vec![Reply::status(503)]),
        ("/cpu-z.html", vec![Reply::ok("Version 2.10")]),
        ("/cpu-z_2.10-cn.exe", vec![Reply::ok("cpu-z")]),
    ])
    .await;
    let tmp = tempfile::tempdir().unwrap();
    let tracker = tracker_in(tmp.path(), 1);

    let summary = tracker
        .run(&failing_and_working_sources(&server), false)
        .await;

    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.updated(), 1);
    assert!(!summary.aborted);
    assert_eq!(summary.reports[0].name, "HWINFO");
    assert_eq!(ledger_text(&tracker), "CPU-Z = 2.10\n");
}

#[tokio::test]
async fn fail_fast_stops_at_the_first_failure() {
    let server = TestServer::start(vec![
        ("/hwinfo/", vec![Reply::ok("<html>no version here</html>")]),
        ("/cpu-z.html", vec![Reply::ok("Version 2.10")]),
    ])
    .await;
    let tmp = tempfile::tempdir().unwrap();
    let tracker = tracker_in(tmp.path(), 1);

    let summary = tracker
        .run(&failing_and_working_sources(&server), true)
        .await;

    assert_eq!(summary.reports.len(), 1);
    assert!(summary.aborted);
    assert!(matches!(
        summary.reports[0].result,
        Err(HwfError::VersionNotFound(_, _))
    ));
    assert_eq!(server.hits("/cpu-z.html"), 0);
}

#[tokio::test]
async fn archive_failure_does_not_block_the_update() {
    let server = TestServer::start(vec![("/a.zip", vec![Reply::ok("tool-a 1.1")])]).await;
    let tmp = tempfile::tempdir().unwrap();
    let tracker = tracker_in(tmp.path(), 1);
    let config = tracker.config().clone();
    tracker.ledger().record_version("ToolA", "1.0").unwrap();
    fs::write(config.active_artifact_path("a.zip"), "tool-a 1.0").unwrap();
    fs::remove_dir(config.history_dir()).unwrap();
    fs::write(config.history_dir(), "not a directory").unwrap();

    let release = Release::new("ToolA", "1.1", server.url("/a.zip"), "a.zip");
    let outcome = tracker.check_release(&release, None).await.unwrap();

    assert!(matches!(
        outcome,
        ToolOutcome::Updated { previous: Some(ref old), .. } if old == "1.0"
    ));
    assert_eq!(
        fs::read_to_string(config.active_artifact_path("a.zip")).unwrap(),
        "tool-a 1.1"
    );
    assert_eq!(ledger_text(&tracker), "ToolA = 1.1\n");
    assert!(config.history_dir().is_file());
}
