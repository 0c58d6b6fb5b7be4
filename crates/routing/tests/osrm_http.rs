use std::time::Duration;

use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use foundation::geo::LonLat;
use routing::{OsrmConfig, OsrmRouter, RoutingError, RoutingService};

async fn route(Path((_profile, coords)): Path<(String, String)>) -> axum::response::Response {
    if coords.starts_with("0,0") {
        return (
            StatusCode::BAD_REQUEST,
            r#"{"code":"NoRoute","message":"Impossible route between points"}"#,
        )
            .into_response();
    }
    if coords.starts_with("1,1") {
        return (StatusCode::BAD_GATEWAY, "upstream down").into_response();
    }
    (
        StatusCode::OK,
        r#"{"code":"Ok","routes":[{"geometry":{"type":"LineString","coordinates":[[124.23,13.58],[124.3,13.86]]}}]}"#,
    )
        .into_response()
}

async fn spawn_fake_osrm() -> String {
    let app = Router::new().route("/route/v1/:profile/:coords", get(route));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn router(base_url: String) -> OsrmRouter {
    OsrmRouter::new(OsrmConfig {
        base_url,
        profile: "driving".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn fetches_segment_over_http() {
    let router = router(spawn_fake_osrm().await);
    let seg = router
        .route(LonLat::new(124.23, 13.58), LonLat::new(124.3, 13.86))
        .await
        .unwrap();
    assert_eq!(seg.coordinates.len(), 2);
}

#[tokio::test]
async fn surfaces_no_route_and_http_status() {
    let router = router(spawn_fake_osrm().await);
    let no_route = router
        .route(LonLat::new(0.0, 0.0), LonLat::new(1.0, 1.0))
        .await
        .unwrap_err();
    assert!(matches!(no_route, RoutingError::NoRoute(_)));

    let status = router
        .route(LonLat::new(1.0, 1.0), LonLat::new(2.0, 2.0))
        .await
        .unwrap_err();
    assert!(matches!(status, RoutingError::Status(502)));
}
