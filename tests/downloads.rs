//! File-mode requests: streaming to disk, resume, auto-rename and progress

mod common;

use common::*;
use reqflow::{DownloadTarget, Request, TaskOutcome};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_download_writes_body_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"0123456789".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client();
    let recorder = Recorder::new();
    let target_path = temp_dir.path().join("nested/dir/file.bin");
    let url = format!("{}/file.bin", mock_server.uri());

    let outcome = client
        .send(
            Request::get(&url).unwrap(),
            Some(DownloadTarget::new(&target_path)),
            recorder.clone(),
        )
        .wait()
        .await;

    let TaskOutcome::Success(info) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(info.body.as_path(), Some(target_path.as_path()));
    assert!(!info.resumed);
    assert_eq!(std::fs::read(&target_path).unwrap(), b"0123456789");

    recorder.assert_lifecycle_order();
    assert_eq!(recorder.loading().first(), Some(&(10, 0)));
    assert_eq!(recorder.loading().last(), Some(&(10, 10)));

    // File downloads never populate the string cache
    assert_eq!(client.cache().get(&url), None);
}

#[tokio::test]
async fn test_resume_requests_range_and_appends_partial_content() {
    let temp_dir = TempDir::new().unwrap();
    let target_path = temp_dir.path().join("movie.mkv");
    std::fs::write(&target_path, b"hello ").unwrap();

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie.mkv"))
        .and(header("Range", "bytes=6-"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", "bytes 6-10/11")
                .set_body_bytes(b"world".to_vec()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client();
    let recorder = Recorder::new();
    let url = format!("{}/movie.mkv", mock_server.uri());

    let outcome = client
        .send(
            Request::get(&url).unwrap(),
            Some(DownloadTarget::resume(&target_path)),
            recorder.clone(),
        )
        .wait()
        .await;

    let TaskOutcome::Success(info) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(info.resumed);
    assert_eq!(info.status, Some(206));
    assert_eq!(std::fs::read(&target_path).unwrap(), b"hello world");
    assert_eq!(recorder.loading().first(), Some(&(11, 6)));
    assert_eq!(recorder.loading().last(), Some(&(11, 11)));
}

#[tokio::test]
async fn test_resume_without_existing_file_sends_no_range() {
    let temp_dir = TempDir::new().unwrap();
    let target_path = temp_dir.path().join("fresh.bin");
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fresh.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"complete".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client();
    let url = format!("{}/fresh.bin", mock_server.uri());

    let outcome = client
        .send(
            Request::get(&url).unwrap(),
            Some(DownloadTarget::resume(&target_path)),
            Recorder::new(),
        )
        .wait()
        .await;

    let TaskOutcome::Success(info) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(!info.resumed);
    assert_eq!(std::fs::read(&target_path).unwrap(), b"complete");

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("range").is_none());
}

#[tokio::test]
async fn test_resume_rewrites_file_when_server_ignores_range() {
    let temp_dir = TempDir::new().unwrap();
    let target_path = temp_dir.path().join("report.pdf");
    std::fs::write(&target_path, b"stale partial data").unwrap();

    let mock_server = MockServer::start().await;

    // Server ignores Range and sends the full body with 200
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .and(header("Range", "bytes=18-"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client();
    let url = format!("{}/report.pdf", mock_server.uri());

    let outcome = client
        .send(
            Request::get(&url).unwrap(),
            Some(DownloadTarget::resume(&target_path)),
            Recorder::new(),
        )
        .wait()
        .await;

    let TaskOutcome::Success(info) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert!(!info.resumed);
    assert_eq!(std::fs::read(&target_path).unwrap(), b"fresh");
}

#[tokio::test]
async fn test_non_resume_download_overwrites_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let target_path = temp_dir.path().join("data.csv");
    std::fs::write(&target_path, b"old contents that are longer").unwrap();

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"a,b\n1,2\n".to_vec()))
        .mount(&mock_server)
        .await;

    let client = test_client();
    let url = format!("{}/data.csv", mock_server.uri());

    let outcome = client
        .send(
            Request::get(&url).unwrap(),
            Some(DownloadTarget::new(&target_path)),
            Recorder::new(),
        )
        .wait()
        .await;

    assert!(outcome.is_success());
    assert_eq!(std::fs::read(&target_path).unwrap(), b"a,b\n1,2\n");

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("range").is_none());
}

#[tokio::test]
async fn test_auto_rename_uses_content_disposition() {
    let temp_dir = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"Q3 Report.csv\"")
                .set_body_bytes(b"x,y\n".to_vec()),
        )
        .mount(&mock_server)
        .await;

    // An existing file with the server's name forces a numbered variant
    std::fs::write(temp_dir.path().join("Q3 Report.csv"), b"keep me").unwrap();

    let client = test_client();
    let temp_path = temp_dir.path().join("export.part");
    let url = format!("{}/export", mock_server.uri());

    let outcome = client
        .send(
            Request::get(&url).unwrap(),
            Some(DownloadTarget::new(&temp_path).with_auto_rename(true)),
            Recorder::new(),
        )
        .wait()
        .await;

    let TaskOutcome::Success(info) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    let renamed = temp_dir.path().join("Q3 Report (1).csv");
    assert_eq!(info.body.as_path(), Some(renamed.as_path()));
    assert!(!temp_path.exists());
    assert_eq!(std::fs::read(&renamed).unwrap(), b"x,y\n");
    assert_eq!(
        std::fs::read(temp_dir.path().join("Q3 Report.csv")).unwrap(),
        b"keep me"
    );
}

#[tokio::test]
async fn test_progress_reports_are_monotonic() {
    let temp_dir = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let body = vec![7u8; 256 * 1024];

    Mock::given(method("GET"))
        .and(path("/large.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&mock_server)
        .await;

    let client = test_client();
    let recorder = Recorder::unthrottled();
    let target_path = temp_dir.path().join("large.bin");
    let url = format!("{}/large.bin", mock_server.uri());

    let outcome = client
        .send(
            Request::get(&url).unwrap(),
            Some(DownloadTarget::new(&target_path)),
            recorder.clone(),
        )
        .wait()
        .await;

    assert!(outcome.is_success());
    recorder.assert_lifecycle_order();

    let loading = recorder.loading();
    let total = body.len() as u64;
    assert!(loading.len() >= 2);
    assert!(loading.iter().all(|&(t, _)| t == total));
    assert!(loading.windows(2).all(|pair| pair[0].1 <= pair[1].1));
    assert_eq!(loading.last(), Some(&(total, total)));
    assert_eq!(std::fs::metadata(&target_path).unwrap().len(), total);
}
