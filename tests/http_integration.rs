//! Integration tests for the HTTP session and dispatch client using wiremock
//!
//! These tests verify transport, credentials, pagination, media and
//! discovery behavior against mocked endpoints.

use gdiscovery::gcp::auth::{ClientCreds, Oauth2Manager, UserCreds};
use gdiscovery::gcp::client::Client;
use gdiscovery::gcp::http::{ReqwestSession, Session};
use gdiscovery::models::{MediaDownload, MediaUpload, ResumableUpload, UploadSource};
use gdiscovery::{CallArgs, GoogleApi, Request, ResponseBody};
use serde_json::json;
use wiremock::matchers::{bearer_token, body_bytes, body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A small storage-like API rooted at the mock server
fn storage_api(server: &MockServer) -> GoogleApi {
    GoogleApi::from_value(json!({
        "name": "storage",
        "version": "v1",
        "rootUrl": format!("{}/", server.uri()),
        "servicePath": "api/v1/",
        "schemas": {
            "File": {"id": "File", "type": "object", "properties": {"name": {"type": "string"}}}
        },
        "resources": {
            "files": {
                "methods": {
                    "list": {
                        "id": "storage.files.list",
                        "httpMethod": "GET",
                        "path": "files",
                        "parameters": {"pageToken": {"type": "string", "location": "query"}}
                    },
                    "insert": {
                        "id": "storage.files.insert",
                        "httpMethod": "POST",
                        "path": "files",
                        "request": {"$ref": "File"},
                        "supportsMediaUpload": true,
                        "mediaUpload": {
                            "accept": ["*/*"],
                            "maxSize": "1KB",
                            "protocols": {
                                "simple": {"multipart": true, "path": "/upload/api/v1/files"},
                                "resumable": {"multipart": true, "path": "/resumable/upload/api/v1/files"}
                            }
                        }
                    },
                    "get": {
                        "id": "storage.files.get",
                        "httpMethod": "GET",
                        "path": "files/{fileId}",
                        "parameterOrder": ["fileId"],
                        "parameters": {"fileId": {"type": "string", "location": "path", "required": true}},
                        "supportsMediaDownload": true,
                        "useMediaDownloadService": true
                    }
                }
            }
        }
    }))
    .expect("Document should load")
}

mod session_tests {
    use super::*;

    /// Test successful GET request returns parsed JSON
    #[tokio::test]
    async fn test_get_success_returns_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [{"name": "a"}, {"name": "b"}]})))
            .mount(&server)
            .await;

        let session = ReqwestSession::new().expect("Session should build");
        let request = Request::new("GET", format!("{}/api/v1/files", server.uri()));
        let response = session.send(&request).await.expect("Request should succeed");

        assert_eq!(response.status_code, 200);
        assert_eq!(response.content()["items"].as_array().unwrap().len(), 2);
        assert_eq!(response.request, request);
    }

    /// Test 401 response becomes an authentication error
    #[tokio::test]
    async fn test_401_maps_to_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": 401, "message": "Invalid credentials"}
            })))
            .mount(&server)
            .await;

        let session = ReqwestSession::new().unwrap();
        let url = format!("{}/api/v1/files", server.uri());
        let err = session
            .send(&Request::new("GET", url.clone()))
            .await
            .expect("Transport should succeed")
            .raise_for_status()
            .unwrap_err();

        assert!(err.is_auth());
        assert_eq!(err.status(), Some(401));
        let text = err.to_string();
        assert!(text.contains("Invalid credentials"));
        assert!(text.contains(&url));
    }

    /// Test 404 response becomes an HTTP error
    #[tokio::test]
    async fn test_404_maps_to_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "Not Found"}
            })))
            .mount(&server)
            .await;

        let session = ReqwestSession::new().unwrap();
        let err = session
            .send(&Request::new("GET", format!("{}/missing", server.uri())))
            .await
            .unwrap()
            .raise_for_status()
            .unwrap_err();

        assert!(err.is_http());
        assert!(!err.is_auth());
        assert_eq!(err.status(), Some(404));
    }

    /// Test 204 No Content gives an empty body
    #[tokio::test]
    async fn test_204_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let session = ReqwestSession::new().unwrap();
        let response = session
            .send(&Request::new("DELETE", format!("{}/api/v1/files/a", server.uri())))
            .await
            .unwrap();

        assert_eq!(response.status_code, 204);
        assert_eq!(response.body, ResponseBody::Empty);
    }

    /// Test JSON bodies are sent as JSON
    #[tokio::test]
    async fn test_json_body_is_sent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_json(json!({"name": "report.txt"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = storage_api(&server);
        let request = api
            .build("files.insert", CallArgs::new().json(json!({"name": "report.txt"})))
            .unwrap();
        let response = ReqwestSession::new().unwrap().send(&request).await.unwrap();

        assert_eq!(response.content(), json!({"id": "1"}));
    }

    /// Test object data bodies are form encoded
    #[tokio::test]
    async fn test_form_data_is_sent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("name=report"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::new("POST", format!("{}/form", server.uri()))
            .with_data(json!({"name": "report"}))
            .unwrap();
        let response = ReqwestSession::new().unwrap().send(&request).await.unwrap();

        assert!(response.is_success());
    }
}

mod client_tests {
    use super::*;

    /// Test the API key lands in the query string
    #[tokio::test]
    async fn test_api_key_is_appended() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/files"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let api = storage_api(&server);
        let client = Client::new().unwrap().with_api_key("secret");
        let request = api.build("files.list", CallArgs::new()).unwrap();
        let response = client.send(request).await.expect("Request should succeed");

        assert!(response.url.contains("key=secret"));
    }

    /// Test user credentials are sent as a bearer token
    #[tokio::test]
    async fn test_user_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(bearer_token("user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let creds = UserCreds {
            access_token: Some("user-token".into()),
            ..Default::default()
        };
        let client = Client::new().unwrap().with_user_creds(creds, None).unwrap();
        let response = client
            .as_user(Request::new("GET", format!("{}/data", server.uri())))
            .await
            .unwrap();

        assert_eq!(response.content(), json!({"ok": true}));
    }

    /// Test expired user credentials are refreshed before sending
    #[tokio::test]
    async fn test_expired_user_creds_are_refreshed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .and(body_string_contains("client_id=app"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh-token",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/data"))
            .and(bearer_token("fresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let creds = UserCreds {
            access_token: Some("stale-token".into()),
            refresh_token: Some("old-refresh".into()),
            expires_at: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
            ..Default::default()
        };
        let client_creds = ClientCreds {
            client_id: "app".into(),
            client_secret: "shh".into(),
            ..Default::default()
        };
        let manager = Oauth2Manager::new()
            .unwrap()
            .with_token_uri(format!("{}/token", server.uri()));
        let client = Client::new()
            .unwrap()
            .with_user_manager(manager, creds, Some(client_creds));

        client
            .as_user(Request::new("GET", format!("{}/data", server.uri())))
            .await
            .expect("Refreshed request should succeed");

        let current = client.user_creds().await.expect("User creds should be set");
        assert_eq!(current.access_token.as_deref(), Some("fresh-token"));
        assert_eq!(current.refresh_token.as_deref(), Some("old-refresh"));
        assert!(!Oauth2Manager::is_expired(&current));
    }

    /// Test a failed refresh is an auth error
    #[tokio::test]
    async fn test_failed_refresh_is_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
            .mount(&server)
            .await;

        let creds = UserCreds {
            refresh_token: Some("revoked".into()),
            ..Default::default()
        };
        let manager = Oauth2Manager::new()
            .unwrap()
            .with_token_uri(format!("{}/token", server.uri()));
        let err = manager
            .refresh(&creds, &ClientCreds::default())
            .await
            .unwrap_err();

        assert!(err.is_auth());
        assert_eq!(err.status(), Some(400));
    }

    /// Test pages are followed until the token runs out
    #[tokio::test]
    async fn test_pages_follow_next_page_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/files"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [2]})))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1], "nextPageToken": "p2"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = storage_api(&server);
        let client = Client::new().unwrap();
        let first = api.build("files.list", CallArgs::new()).unwrap();
        let pages = client.pages(first, None).await.unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].content()["items"], json!([1]));
        assert_eq!(pages[1].content()["items"], json!([2]));
    }

    /// Test a server repeating its token doesn't loop forever
    #[tokio::test]
    async fn test_pages_stop_on_repeated_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nextPageToken": "same"})))
            .mount(&server)
            .await;

        let api = storage_api(&server);
        let client = Client::new().unwrap();
        let first = api.build("files.list", CallArgs::new()).unwrap();
        let pages = client.pages(first, Some(10)).await.unwrap();

        assert_eq!(pages.len(), 2);
    }

    /// Test discovery documents are fetched from the Discovery Service
    #[tokio::test]
    async fn test_discover_fetches_document() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/discovery/v1/apis/storage/v1/rest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "storage",
                "version": "v1",
                "rootUrl": "https://storage.example.com/",
                "servicePath": "storage/v1/",
                "resources": {"buckets": {"methods": {"list": {"httpMethod": "GET", "path": "b"}}}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new().unwrap().with_discovery_root_url(&server.uri()).unwrap();
        let api = client.discover("storage", "v1").await.expect("Discovery should succeed");

        assert_eq!(api.name(), "storage");
        assert!(!api.validates());
        let request = api.build("buckets.list", CallArgs::new()).unwrap();
        assert_eq!(request.url(), "https://storage.example.com/storage/v1/b");
    }

    /// Test the preferred version comes from apis.list
    #[tokio::test]
    async fn test_discover_preferred_uses_listing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/discovery/v1/apis"))
            .and(query_param("name", "books"))
            .and(query_param("preferred", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "discovery#directoryList",
                "items": [{"name": "books", "version": "v1", "preferred": true}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/discovery/v1/apis/books/v1/rest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "books", "version": "v1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new().unwrap().with_discovery_root_url(&server.uri()).unwrap();
        let api = client.discover_preferred("books").await.unwrap();

        assert_eq!(api.version(), "v1");
    }

    /// Test an unknown API name is a usage error
    #[tokio::test]
    async fn test_discover_preferred_unknown_api() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/discovery/v1/apis"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "discovery#directoryList"})))
            .mount(&server)
            .await;

        let client = Client::new().unwrap().with_discovery_root_url(&server.uri()).unwrap();
        let err = client.discover_preferred("nope").await.unwrap_err();

        assert!(err.is_usage());
    }
}

mod media_tests {
    use super::*;

    /// Test an upload without metadata is a simple media upload
    #[tokio::test]
    async fn test_simple_upload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload/api/v1/files"))
            .and(query_param("uploadType", "media"))
            .and(body_bytes(b"hello".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "f1"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = storage_api(&server);
        let request = api
            .build("files.insert", CallArgs::new().upload_file(b"hello".to_vec()))
            .unwrap();
        let response = Client::new().unwrap().send(request).await.unwrap();

        assert_eq!(response.content()["id"], "f1");
    }

    /// Test an upload with metadata is sent as multipart/related
    #[tokio::test]
    async fn test_multipart_upload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload/api/v1/files"))
            .and(query_param("uploadType", "multipart"))
            .and(|req: &wiremock::Request| {
                req.headers
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.starts_with("multipart/related; boundary="))
                    .unwrap_or(false)
            })
            .and(body_string_contains("{\"name\":\"notes.txt\"}"))
            .and(body_string_contains("hello"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "f2"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = storage_api(&server);
        let request = api
            .build(
                "files.insert",
                CallArgs::new()
                    .json(json!({"name": "notes.txt"}))
                    .upload_file(b"hello".to_vec()),
            )
            .unwrap();
        let response = Client::new().unwrap().send(request).await.unwrap();

        assert_eq!(response.content()["id"], "f2");
    }

    /// Test large content goes through a resumable session in chunks
    #[tokio::test]
    async fn test_resumable_upload_in_chunks() {
        let server = MockServer::start().await;
        let session_url = format!("{}/session/1", server.uri());

        Mock::given(method("POST"))
            .and(path("/resumable/upload/api/v1/files"))
            .and(query_param("uploadType", "resumable"))
            .and(header("X-Upload-Content-Length", "10"))
            .respond_with(ResponseTemplate::new(200).insert_header("Location", session_url.as_str()))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/session/1"))
            .and(header("Content-Range", "bytes 8-9/10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "big"})))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/session/1"))
            .respond_with(ResponseTemplate::new(308))
            .expect(2)
            .mount(&server)
            .await;

        let mut upload = MediaUpload::new(
            UploadSource::Bytes(b"0123456789".to_vec()),
            format!("{}/upload/api/v1/files", server.uri()),
        );
        upload.resumable = Some(ResumableUpload {
            upload_path: format!("{}/resumable/upload/api/v1/files", server.uri()),
            multipart: true,
            chunk_size: 4,
        });
        let request = Request::new("POST", format!("{}/api/v1/files", server.uri())).with_media_upload(Some(upload));

        let response = Client::new().unwrap().send(request).await.unwrap();

        assert_eq!(response.content()["id"], "big");
    }

    /// Test a file upload is streamed in chunk_size pieces with its full length
    #[tokio::test]
    async fn test_simple_upload_streams_file() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload/api/v1/files"))
            .and(query_param("uploadType", "media"))
            .and(header("content-length", "11"))
            .and(body_bytes(b"hello world".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "f3"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("Should create temp dir");
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, b"hello world").expect("Should write upload file");

        let mut upload = MediaUpload::new(UploadSource::Path(file), format!("{}/upload/api/v1/files", server.uri()));
        upload.chunk_size = 3;
        let request = Request::new("POST", format!("{}/api/v1/files", server.uri())).with_media_upload(Some(upload));
        let response = Client::new().unwrap().send(request).await.unwrap();

        assert_eq!(response.content()["id"], "f3");
    }

    /// Test a multipart body wraps the streamed file between the boundaries
    #[tokio::test]
    async fn test_multipart_upload_streams_file() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload/api/v1/files"))
            .and(query_param("uploadType", "multipart"))
            .and(body_string_contains("{\"name\":\"notes.txt\"}"))
            .and(body_string_contains("Content-Type: text/plain\r\n\r\nhello world\r\n--"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "f4"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("Should create temp dir");
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, b"hello world").expect("Should write upload file");

        let mut upload = MediaUpload::new(UploadSource::Path(file), format!("{}/upload/api/v1/files", server.uri()));
        upload.chunk_size = 2;
        upload.multipart = true;
        upload.content_type = Some("text/plain".into());
        let request = Request::new("POST", format!("{}/api/v1/files", server.uri()))
            .with_json(json!({"name": "notes.txt"}))
            .unwrap()
            .with_media_upload(Some(upload));
        let response = Client::new().unwrap().send(request).await.unwrap();

        assert_eq!(response.content()["id"], "f4");
    }

    /// Test each resumable PUT carries the matching slice of the file
    #[tokio::test]
    async fn test_resumable_upload_reads_file_chunks() {
        let server = MockServer::start().await;
        let session_url = format!("{}/session/2", server.uri());

        Mock::given(method("POST"))
            .and(path("/resumable/upload/api/v1/files"))
            .and(header("X-Upload-Content-Length", "10"))
            .respond_with(ResponseTemplate::new(200).insert_header("Location", session_url.as_str()))
            .expect(1)
            .mount(&server)
            .await;

        for (range, chunk) in [("bytes 0-3/10", "0123"), ("bytes 4-7/10", "4567")] {
            Mock::given(method("PUT"))
                .and(path("/session/2"))
                .and(header("Content-Range", range))
                .and(body_bytes(chunk.as_bytes().to_vec()))
                .respond_with(ResponseTemplate::new(308))
                .expect(1)
                .mount(&server)
                .await;
        }

        Mock::given(method("PUT"))
            .and(path("/session/2"))
            .and(header("Content-Range", "bytes 8-9/10"))
            .and(body_bytes(b"89".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "from-file"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("Should create temp dir");
        let file = dir.path().join("digits.bin");
        std::fs::write(&file, b"0123456789").expect("Should write upload file");

        let mut upload = MediaUpload::new(UploadSource::Path(file), format!("{}/upload/api/v1/files", server.uri()));
        upload.resumable = Some(ResumableUpload {
            upload_path: format!("{}/resumable/upload/api/v1/files", server.uri()),
            multipart: true,
            chunk_size: 4,
        });
        let request = Request::new("POST", format!("{}/api/v1/files", server.uri())).with_media_upload(Some(upload));
        let response = Client::new().unwrap().send(request).await.unwrap();

        assert_eq!(response.content()["id"], "from-file");
    }

    /// Test oversized uploads fail before anything is sent
    #[tokio::test]
    async fn test_upload_over_max_size_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = storage_api(&server);
        let request = api
            .build("files.insert", CallArgs::new().upload_file(vec![0u8; 2048]))
            .unwrap();
        let err = Client::new().unwrap().send(request).await.unwrap_err();

        assert!(err.is_validation());
        assert!(err.to_string().contains("Max upload size"));
    }

    /// Test downloads stream into the target file through the download service
    #[tokio::test]
    async fn test_download_to_file() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/download/api/v1/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("abc.bin");
        let api = storage_api(&server);
        let request = api
            .build(
                "files.get",
                CallArgs::new().param("fileId", "abc").download_file(target.clone()),
            )
            .unwrap();
        let response = Client::new().unwrap().send(request).await.unwrap();

        assert_eq!(response.body, ResponseBody::Empty);
        assert_eq!(response.download_file.as_deref(), Some(target.as_path()));
        assert_eq!(std::fs::read(&target).unwrap(), b"payload");
    }

    /// Test a download larger than the write buffer lands intact
    #[tokio::test]
    async fn test_download_with_small_chunk_size() {
        let server = MockServer::start().await;
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();

        Mock::given(method("GET"))
            .and(path("/media/big"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("Should create temp dir");
        let target = dir.path().join("big.bin");
        let download = MediaDownload {
            file_path: target.clone(),
            download_url: format!("{}/media/big", server.uri()),
            chunk_size: 7,
        };
        let request = Request::new("GET", format!("{}/api/big", server.uri())).with_media_download(Some(download));
        let response = Client::new().unwrap().send(request).await.unwrap();

        assert_eq!(response.body, ResponseBody::Empty);
        assert_eq!(std::fs::read(&target).unwrap(), payload);
    }
}
