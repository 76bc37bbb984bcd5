use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    error::ApiError,
    state::AppState,
    users::{
        dto::{DeletedUserResponse, UserPayload, UserResponse, UsersResponse},
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(list_users).post(create_user))
        .route(
            "/user/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

/// Turn axum's plain-text body rejection into the JSON failure envelope.
fn read_body(body: Result<Json<UserPayload>, JsonRejection>) -> Result<UserPayload, ApiError> {
    match body {
        Ok(Json(payload)) => Ok(payload),
        Err(rejection) => {
            warn!(error = %rejection, "rejected request body");
            Err(ApiError::MalformedBody)
        }
    }
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let users = services::list_users(state.store.as_ref()).await?;
    Ok(Json(UsersResponse {
        success: true,
        users,
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = services::get_user(state.store.as_ref(), &id).await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

#[instrument(skip(state, body))]
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<UserPayload>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<UserResponse>), ApiError> {
    let payload = read_body(body)?;
    let user = services::create_user(state.store.as_ref(), payload).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/user/{}", user.id)) {
        headers.insert(header::LOCATION, location);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(UserResponse {
            success: true,
            user,
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = services::update_user(state.store.as_ref(), &id, read_body(body)).await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedUserResponse>, ApiError> {
    let user = services::delete_user(state.store.as_ref(), &id).await?;
    Ok(Json(DeletedUserResponse {
        success: true,
        message: "User deleted successfully".into(),
        user,
    }))
}

#[cfg(test)]
mod tests {
    use crate::app::build_app;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt as _;
    use uuid::Uuid;

    fn test_app() -> Router {
        build_app(AppState::fake())
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(b) => {
                builder = builder.header("content-type", "application/json");
                Body::from(b.to_owned())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    const ALICE: &str = r#"{"username":"alice","email":"a@x.com","phone":"12345678"}"#;

    #[tokio::test]
    async fn create_returns_created_with_defaults() {
        let app = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/user")
            .header("content-type", "application/json")
            .body(Body::from(ALICE))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_owned();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["user"]["username"], "alice");
        assert_eq!(json["user"]["address"], "");
        assert!(json["user"]["createdAt"].is_string());
        assert!(json["user"]["updatedAt"].is_string());
        let id = json["user"]["id"].as_str().unwrap();
        assert!(!id.is_empty());
        assert_eq!(location, format!("/user/{id}"));
    }

    #[tokio::test]
    async fn concrete_scenario() {
        let app = test_app();

        let (status, created) = send(&app, "POST", "/user", Some(ALICE)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, dup) = send(&app, "POST", "/user", Some(ALICE)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(dup["success"], false);
        assert_eq!(dup["error"], "Email already exists");

        let (status, bad) = send(&app, "GET", "/user/not-a-valid-id", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(bad["error"], "Invalid user ID");

        let unknown = format!("/user/{}", Uuid::new_v4());
        let (status, missing) = send(&app, "DELETE", &unknown, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(missing["error"], "User not found");

        let (status, list) = send(&app, "GET", "/user", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["success"], true);
        assert_eq!(list["users"].as_array().unwrap().len(), 1);
        assert_eq!(list["users"][0], created["user"]);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let app = test_app();
        let (status, json) = send(
            &app,
            "POST",
            "/user",
            Some(r#"{"username":"alice","email":"a@x.com"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Username, email, and phone are required");

        let (_, list) = send(&app, "GET", "/user", None).await;
        assert!(list["users"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_bodies_use_the_envelope() {
        let app = test_app();

        let (status, json) = send(&app, "POST", "/user", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Invalid request body");

        let (status, json) = send(
            &app,
            "POST",
            "/user",
            Some(r#"{"username":"alice","email":"a@x.com","phone":12345678}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid request body");

        let request = Request::builder()
            .method("POST")
            .uri("/user")
            .header("content-type", "text/plain")
            .body(Body::from(ALICE))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_checks_identifier_before_body() {
        let app = test_app();
        let (status, json) = send(&app, "PUT", "/user/not-a-valid-id", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid user ID");
    }

    #[tokio::test]
    async fn update_then_get_reflects_new_values() {
        let app = test_app();
        let (_, created) = send(&app, "POST", "/user", Some(ALICE)).await;
        let uri = format!("/user/{}", created["user"]["id"].as_str().unwrap());

        let (status, updated) = send(
            &app,
            "PUT",
            &uri,
            Some(r#"{"username":"alicia","email":"alicia@x.com","phone":"555","address":"Elm St"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["success"], true);
        assert_eq!(updated["user"]["id"], created["user"]["id"]);
        assert_eq!(updated["user"]["createdAt"], created["user"]["createdAt"]);
        assert_ne!(updated["user"]["updatedAt"], created["user"]["updatedAt"]);

        let (status, fetched) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["user"], updated["user"]);
        assert_eq!(fetched["user"]["address"], "Elm St");
    }

    #[tokio::test]
    async fn update_unknown_and_duplicate() {
        let app = test_app();
        let (_, _alice) = send(&app, "POST", "/user", Some(ALICE)).await;
        let (_, bob) = send(
            &app,
            "POST",
            "/user",
            Some(r#"{"username":"bob","email":"b@x.com","phone":"1"}"#),
        )
        .await;

        let unknown = format!("/user/{}", Uuid::new_v4());
        let (status, _) = send(&app, "PUT", &unknown, Some(ALICE)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let bob_uri = format!("/user/{}", bob["user"]["id"].as_str().unwrap());
        let (status, json) = send(&app, "PUT", &bob_uri, Some(ALICE)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "Email already exists");
    }

    #[tokio::test]
    async fn delete_returns_record_and_message_once() {
        let app = test_app();
        let (_, created) = send(&app, "POST", "/user", Some(ALICE)).await;
        let uri = format!("/user/{}", created["user"]["id"].as_str().unwrap());

        let (status, json) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "User deleted successfully");
        assert_eq!(json["user"], created["user"]);

        let (status, json) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);

        let (status, _) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = test_app();
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
