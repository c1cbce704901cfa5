//! Demonstration endpoints served behind the gateway layers.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

pub fn demo_routes() -> Router {
    Router::new().route("/test", get(get_test).post(post_test))
}

async fn get_test() -> Json<Value> {
    Json(json!({ "message": "Test endpoint working!" }))
}

/// Echo a JSON body. A request without a JSON content type echoes `{}`.
async fn post_test(payload: Result<Json<Value>, JsonRejection>) -> Response {
    let data = match payload {
        Ok(Json(value)) => value,
        Err(JsonRejection::MissingJsonContentType(_)) => json!({}),
        Err(rejection) => return rejection.into_response(),
    };

    (
        StatusCode::CREATED,
        Json(json!({ "message": "Post request received!", "data": data })),
    )
        .into_response()
}
