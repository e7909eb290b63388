use std::collections::HashMap;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use oekaki_db::{DbError, Picture};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use ts_rs::TS;

use crate::crypto::author_hash;
use crate::error::AppError;
use crate::gallery::{self, Upload};
use crate::state::AppState;

/// A picture as shown to clients. Author and signature stay private.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PictureView {
    pub id: String,
    pub name: String,
    pub tag: String,
    pub answer: String,
    pub posted_at: DateTime<Utc>,
}

impl From<Picture> for PictureView {
    fn from(p: Picture) -> Self {
        Self {
            id: p.id,
            name: p.name,
            tag: p.tag,
            answer: p.answer,
            posted_at: p.posted_at,
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PictureResponse {
    /// SHA-256 of the author name, empty when the picture is unknown
    pub author_hash: String,
    pub id: String,
    pub picture: Option<PictureView>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PostResponse {
    pub id: String,
}

/// Text fields and the optional `file` part of a multipart form
#[derive(Default)]
struct Form {
    fields: HashMap<String, String>,
    file: Option<Vec<u8>>,
}

impl Form {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Form::default();
        while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == "file" {
                let data = field.bytes().await.map_err(invalid_form)?;
                form.file = Some(data.to_vec());
            } else {
                let value = field.text().await.map_err(invalid_form)?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// Missing fields read as empty
    fn take(&mut self, name: &str) -> String {
        self.fields.remove(name).unwrap_or_default()
    }
}

fn invalid_form(e: MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid form data: {e}"))
}

/// POST /api/post
pub async fn post_picture(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PostResponse>, AppError> {
    let mut form = Form::read(multipart).await?;
    let data = form
        .file
        .take()
        .ok_or_else(|| AppError::BadRequest("Missing file".into()))?;

    let upload = Upload {
        data,
        tag: form.take("tag"),
        answer: form.take("answer"),
        author: form.take("author"),
        signature: form.take("signature"),
    };

    let id = gallery::post_picture(&state, upload).await?;
    Ok(Json(PostResponse { id }))
}

#[derive(Deserialize)]
pub struct ListParams {
    /// Tag; empty or absent lists every tag
    t: Option<String>,
    /// Id of the newest picture the client already has
    r: Option<String>,
    /// Author name
    a: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// GET /api/list
pub async fn list_pictures(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<PictureView>>, AppError> {
    let tag = params.t.as_deref().unwrap_or_default();
    let pictures =
        gallery::list_pictures(&state, tag, non_empty(&params.r), non_empty(&params.a)).await?;
    Ok(Json(pictures.into_iter().map(PictureView::from).collect()))
}

#[derive(Deserialize)]
pub struct PictureParams {
    #[serde(default)]
    id: String,
}

/// GET /api/picture
pub async fn get_picture(
    State(state): State<AppState>,
    Query(params): Query<PictureParams>,
) -> Result<Json<PictureResponse>, AppError> {
    let response = match state.pictures.get(&params.id).await {
        Ok(picture) => PictureResponse {
            author_hash: author_hash(&picture.author),
            id: params.id,
            picture: Some(picture.into()),
        },
        Err(DbError::NotFound(_)) => PictureResponse {
            author_hash: String::new(),
            id: params.id,
            picture: None,
        },
        Err(e) => return Err(e.into()),
    };
    Ok(Json(response))
}

/// POST /api/delete
pub async fn delete_picture(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut form = Form::read(multipart).await?;
    let id = form.take("id");
    let signature = form.take("signature");

    gallery::delete_picture(&state, &id, &signature).await?;
    Ok(Json(json!({ "result": "ok" })))
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use oekaki_db::MemoryPictureStore;
    use oekaki_feed_cache::{MemoryCacheStore, RecencyCache};
    use tempfile::tempdir;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::router;
    use crate::storage::BlobStore;

    const BOUNDARY: &str = "oekaki-test-boundary";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot really a picture";

    fn test_app(blob_dir: &Path) -> Router {
        let pictures = Arc::new(MemoryPictureStore::new());
        let feed = RecencyCache::new(Arc::new(MemoryCacheStore::new()), pictures.clone());
        router(AppState {
            pictures,
            feed,
            blobs: Arc::new(BlobStore::new(blob_dir.to_path_buf())),
        })
    }

    fn multipart_request(uri: &str, fields: &[(&str, &str)], file: Option<&[u8]>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(data) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"picture.png\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn post(app: &Router, tag: &str, author: &str, signature: &str) -> String {
        let request = multipart_request(
            "/api/post",
            &[
                ("tag", tag),
                ("answer", "neko"),
                ("author", author),
                ("signature", signature),
            ],
            Some(PNG),
        );
        let (status, json) = send_json(app, request).await;
        assert_eq!(status, StatusCode::OK);
        json["id"].as_str().unwrap().to_string()
    }

    async fn list(app: &Router, query: &str) -> Vec<String> {
        let (status, json) = send_json(app, get_request(&format!("/api/list?{query}"))).await;
        assert_eq!(status, StatusCode::OK);
        json.as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap().to_string())
            .collect()
    }

    async fn delete(app: &Router, id: &str, signature: &str) -> StatusCode {
        let request =
            multipart_request("/api/delete", &[("id", id), ("signature", signature)], None);
        send(app, request).await.0
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());
        let (status, json) = send_json(&app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_post_then_list_and_serve_image() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());
        let id = post(&app, "cat", "iori", "secret").await;

        let (status, json) = send_json(&app, get_request("/api/list?t=cat")).await;
        assert_eq!(status, StatusCode::OK);
        let listed = &json[0];
        assert_eq!(listed["id"], id.as_str());
        assert_eq!(listed["tag"], "cat");
        assert_eq!(listed["answer"], "neko");
        assert!(listed.get("author").is_none());
        assert!(listed.get("signatureHash").is_none());

        let name = listed["name"].as_str().unwrap();
        assert!(name.ends_with(".png"));
        let (status, body) = send(&app, get_request(&format!("/images/{name}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, PNG);
    }

    #[tokio::test]
    async fn test_post_without_file_is_rejected() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());
        let request = multipart_request("/api/post", &[("tag", "cat")], None);
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(list(&app, "").await.is_empty());
    }

    #[tokio::test]
    async fn test_post_rejects_long_fields() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());

        let long_tag = "t".repeat(31);
        let request = multipart_request("/api/post", &[("tag", &long_tag)], Some(PNG));
        assert_eq!(send(&app, request).await.0, StatusCode::BAD_REQUEST);

        let long_author = "a".repeat(41);
        let request = multipart_request("/api/post", &[("author", &long_author)], Some(PNG));
        assert_eq!(send(&app, request).await.0, StatusCode::BAD_REQUEST);

        let tag = "t".repeat(30);
        post(&app, &tag, "iori", "secret").await;
        assert!(list(&app, "").await.len() == 1);
        // Nothing written for the rejected posts
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_list_by_tag_and_globally() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());
        let cat1 = post(&app, "cat", "iori", "s").await;
        let cat2 = post(&app, "cat", "iori", "s").await;
        let dog = post(&app, "dog", "iori", "s").await;

        assert_eq!(list(&app, "t=cat").await, vec![cat2.clone(), cat1.clone()]);
        assert_eq!(list(&app, "t=dog").await, vec![dog.clone()]);
        assert_eq!(list(&app, "").await, vec![dog, cat2, cat1]);
        assert!(list(&app, "t=bird").await.is_empty());
    }

    #[tokio::test]
    async fn test_list_after_recent_id() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());
        let first = post(&app, "", "iori", "s").await;
        let second = post(&app, "", "iori", "s").await;
        let third = post(&app, "", "iori", "s").await;

        assert_eq!(list(&app, &format!("r={second}")).await, vec![third.clone()]);
        assert!(list(&app, &format!("r={third}")).await.is_empty());
        assert_eq!(list(&app, "r=unknown").await, vec![third, second, first]);
    }

    #[tokio::test]
    async fn test_list_by_author() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());
        let mine = post(&app, "cat", "iori", "s").await;
        post(&app, "cat", "someone", "s").await;
        let mine_too = post(&app, "dog", "iori", "s").await;

        assert_eq!(list(&app, "a=iori").await, vec![mine_too, mine]);
        assert!(list(&app, "a=nobody").await.is_empty());
    }

    #[tokio::test]
    async fn test_picture_detail() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());
        let id = post(&app, "cat", "iori", "secret").await;

        let (status, json) = send_json(&app, get_request(&format!("/api/picture?id={id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], id.as_str());
        assert_eq!(json["authorHash"], author_hash("iori"));
        assert_eq!(json["picture"]["id"], id.as_str());
        assert!(json["picture"].get("author").is_none());
    }

    #[tokio::test]
    async fn test_picture_detail_unknown_id() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());

        let (status, json) = send_json(&app, get_request("/api/picture?id=missing")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], "missing");
        assert_eq!(json["authorHash"], "");
        assert!(json["picture"].is_null());
    }

    #[tokio::test]
    async fn test_delete_requires_matching_signature() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());
        let id = post(&app, "cat", "iori", "secret").await;

        assert_eq!(delete(&app, &id, "wrong").await, StatusCode::BAD_REQUEST);
        assert_eq!(list(&app, "t=cat").await, vec![id]);
    }

    #[tokio::test]
    async fn test_delete_unknown_picture_is_bad_request() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());
        assert_eq!(delete(&app, "missing", "secret").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_removes_picture_everywhere() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());
        let kept = post(&app, "cat", "iori", "secret").await;
        let doomed = post(&app, "cat", "iori", "secret").await;

        // Warm both buckets so the delete has cached lists to invalidate
        assert_eq!(list(&app, "t=cat").await.len(), 2);
        assert_eq!(list(&app, "").await.len(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);

        let (status, json) = send_json(
            &app,
            multipart_request(
                "/api/delete",
                &[("id", &doomed), ("signature", "secret")],
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["result"], "ok");

        assert_eq!(list(&app, "t=cat").await, vec![kept.clone()]);
        assert_eq!(list(&app, "").await, vec![kept]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        let (_, json) = send_json(&app, get_request(&format!("/api/picture?id={doomed}"))).await;
        assert!(json["picture"].is_null());
    }
}
