use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use storywatch_core::StoryItem;
use storywatch_engine::{
    normalize_story, ClientSettings, FailureKind, HttpStoryClient, StoryClient,
};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpStoryClient {
    client_with(server, ClientSettings::default())
}

fn client_with(server: &MockServer, settings: ClientSettings) -> HttpStoryClient {
    HttpStoryClient::new(ClientSettings {
        api_base: format!("{}/api/v1", server.uri()),
        ..settings
    })
    .expect("client builds")
}

#[tokio::test]
async fn user_id_accepts_string_and_numeric_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .and(query_param("username", "alice"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"user": {"id": "25025320"}}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .and(query_param("username", "bob"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"user": {"id": 787132}}})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.user_id("alice").await.unwrap(), "25025320");
    assert_eq!(client.user_id("bob").await.unwrap(), "787132");
}

#[tokio::test]
async fn unknown_user_is_an_http_status_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server).user_id("ghost").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn list_stories_reads_reel_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/feed/reels_media/"))
        .and(query_param("reel_ids", "25025320"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reels": {
                "25025320": {
                    "items": [
                        {"pk": "3301", "id": "3301_25025320", "media_type": 1},
                        {"id": "3302_25025320", "media_type": 2},
                        {"media_type": 1}
                    ]
                }
            }
        })))
        .mount(&server)
        .await;

    let raw = client_for(&server).list_stories(25025320).await.unwrap();
    let items: Vec<StoryItem> = raw
        .iter()
        .filter_map(|story| normalize_story(story, "alice"))
        .collect();

    assert_eq!(raw.len(), 3);
    assert_eq!(
        items,
        vec![StoryItem::new(3301, "alice"), StoryItem::new(3302, "alice")]
    );
}

#[tokio::test]
async fn missing_reel_means_no_active_stories() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/feed/reels_media/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reels": {}})))
        .mount(&server)
        .await;

    let raw = client_for(&server).list_stories(1).await.unwrap();
    assert!(raw.is_empty());
}

#[tokio::test]
async fn server_error_and_auth_rejection_are_distinguished() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/feed/reels_media/"))
        .and(query_param("reel_ids", "1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/feed/reels_media/"))
        .and(query_param("reel_ids", "2"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(
        client.list_stories(1).await.unwrap_err().kind,
        FailureKind::HttpStatus(500)
    );
    assert_eq!(client.list_stories(2).await.unwrap_err().kind, FailureKind::Auth);
}

#[tokio::test]
async fn slow_listing_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/feed/reels_media/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({"reels": {}})),
        )
        .mount(&server)
        .await;

    let client = client_with(
        &server,
        ClientSettings {
            request_timeout: Duration::from_millis(50),
            ..ClientSettings::default()
        },
    );
    assert_eq!(
        client.list_stories(1).await.unwrap_err().kind,
        FailureKind::Timeout
    );
}

#[tokio::test]
async fn download_prefers_video_and_names_file_by_story_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/media/9/info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "video_versions": [{"url": format!("{}/cdn/9.mp4", server.uri())}],
                "image_versions2": {"candidates": [{"url": format!("{}/cdn/9.jpg", server.uri())}]}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cdn/9.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video-bytes".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let written = client_for(&server)
        .download_story(9, temp.path())
        .await
        .unwrap();

    assert_eq!(written, temp.path().join("9.mp4"));
    assert_eq!(std::fs::read(&written).unwrap(), b"video-bytes");
}

#[tokio::test]
async fn photo_story_is_saved_as_jpg() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/media/10/info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "image_versions2": {"candidates": [{"url": format!("{}/cdn/10.jpg", server.uri())}]}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cdn/10.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let written = client_for(&server)
        .download_story(10, temp.path())
        .await
        .unwrap();
    assert_eq!(written, temp.path().join("10.jpg"));
}

#[tokio::test]
async fn oversized_media_is_rejected_and_nothing_is_written() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/media/11/info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "image_versions2": {"candidates": [{"url": format!("{}/cdn/11.jpg", server.uri())}]}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cdn/11.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Length", "11")
                .set_body_string("01234567890"),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let client = client_with(
        &server,
        ClientSettings {
            max_media_bytes: 10,
            ..ClientSettings::default()
        },
    );
    let err = client.download_story(11, temp.path()).await.unwrap_err();

    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
    assert!(!temp.path().join("11.jpg").exists());
}

#[tokio::test]
async fn login_session_can_be_exported_and_restored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/login/"))
        .and(body_string_contains("username=watcher"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ig-set-authorization", "Bearer IGT:2:token")
                .set_body_json(json!({"status": "ok"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/current_user/"))
        .and(header("authorization", "Bearer IGT:2:token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let first = client_for(&server);
    assert_eq!(
        first.verify_session().await.unwrap_err().kind,
        FailureKind::Auth
    );
    first.login("watcher", "hunter2").await.unwrap();
    first.verify_session().await.unwrap();
    let material = first.export_session().unwrap();

    let second = client_for(&server);
    second.restore_session(&material).await.unwrap();
    second.verify_session().await.unwrap();
}

#[tokio::test]
async fn login_without_authorization_header_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/accounts/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .login("watcher", "hunter2")
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Auth);
}

#[tokio::test]
async fn restoring_garbage_session_fails() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    assert!(client.restore_session(b"not json").await.is_err());
    assert_eq!(
        client.restore_session(b"{}").await.unwrap_err().kind,
        FailureKind::Auth
    );
}
