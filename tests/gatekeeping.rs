//! End-to-end tests for the gatekeeping chain.

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{header, Method, StatusCode};
use serde_json::{json, Value};

mod common;

use common::{start_gateway, test_config};

#[tokio::test]
async fn test_welcome_and_quota_headers() {
    let gw = start_gateway(test_config(100)).await;

    let res = gw.client.get(gw.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.headers()["ratelimit-policy"], "100;w=600");
    assert!(res.headers()["ratelimit"]
        .to_str()
        .unwrap()
        .starts_with("limit=100, remaining=99"));
    assert_eq!(res.json::<Value>().await.unwrap(), json!({ "msg": "Welcome" }));
}

#[tokio::test]
async fn test_unknown_route_is_normalized_404() {
    let gw = start_gateway(test_config(100)).await;

    for path in ["/nowhere", "/toppicks", "/toppic/unknown/action"] {
        let res = gw.client.get(gw.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path}");
        assert_eq!(
            res.json::<Value>().await.unwrap(),
            json!({ "error": "Invalid endpoint. Not found." })
        );
    }
}

#[tokio::test]
async fn test_rate_limit_rejects_over_budget() {
    let gw = start_gateway(test_config(3)).await;

    for _ in 0..3 {
        let res = gw.client.get(gw.url("/")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = gw.client.get(gw.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = res.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 600);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "rate_limited");

    // Rejected before routing: an unknown path is also 429, not 404.
    let res = gw.client.get(gw.url("/nowhere")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_concurrent_requests_never_exceed_budget() {
    let gw = start_gateway(test_config(20)).await;

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let client = gw.client.clone();
        let url = gw.url("/");
        tasks.push(tokio::spawn(async move {
            client.get(url).send().await.unwrap().status()
        }));
    }

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() == StatusCode::OK {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 20);
}

#[tokio::test]
async fn test_cors_preflight() {
    let mut config = test_config(100);
    config.cors.allowed_origins = vec!["https://shop.example".into()];
    let gw = start_gateway(config).await;

    let res = gw
        .client
        .request(Method::OPTIONS, gw.url("/custom"))
        .header(header::ORIGIN, "https://shop.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://shop.example"
    );

    let res = gw
        .client
        .request(Method::OPTIONS, gw.url("/custom"))
        .header(header::ORIGIN, "https://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(!res
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));

    let res = gw
        .client
        .get(gw.url("/toppic"))
        .header(header::ORIGIN, "https://shop.example")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://shop.example"
    );
}

#[tokio::test]
async fn test_public_collection_crud() {
    let gw = start_gateway(test_config(100)).await;

    let res = gw
        .client
        .post(gw.url("/toppic/add"))
        .json(&json!({ "category": "men", "poster": "a.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let added: Value = res.json().await.unwrap();
    let id = added["data"]["_id"].as_str().unwrap().to_string();

    gw.client
        .post(gw.url("/toppic/add"))
        .json(&json!({ "category": "women", "poster": "b.png" }))
        .send()
        .await
        .unwrap();

    let listed: Value = gw
        .client
        .get(gw.url("/toppic?category=men"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let docs = listed["Top Pic"].as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["poster"], "a.png");

    let res = gw
        .client
        .patch(gw.url(&format!("/toppic/update/{id}")))
        .json(&json!({ "poster": "c.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = gw
        .client
        .delete(gw.url(&format!("/toppic/delete/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let listed: Value = gw
        .client
        .get(gw.url("/toppic?category=men"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed["Top Pic"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let gw = start_gateway(test_config(100)).await;

    let res = gw
        .client
        .post(gw.url("/toppic/add"))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{\"category\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "bad_request");
}

#[tokio::test]
async fn test_protected_route_auth_failures() {
    let gw = start_gateway(test_config(100)).await;

    let res = gw.client.get(gw.url("/custom")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "token_missing");
    assert_eq!(body["msg"], "Token not Found");

    let res = gw
        .client
        .get(gw.url("/custom"))
        .header(header::AUTHORIZATION, "Basic dTE6cHc=")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let stale = gw
        .gate
        .keys()
        .issue_at("u1", Utc::now() - ChronoDuration::days(2))
        .unwrap();
    let res = gw
        .client
        .get(gw.url("/custom"))
        .bearer_auth(stale)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>().await.unwrap()["error"], "token_expired");

    let res = gw
        .client
        .get(gw.url("/custom"))
        .bearer_auth("not.a.jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_valid_token() {
    let gw = start_gateway(test_config(100)).await;
    let token = gw.token("u1");

    let res = gw
        .client
        .post(gw.url("/custom/add"))
        .bearer_auth(&token)
        .json(&json!({ "title": "Graphic tee", "price": 299 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let listed: Value = gw
        .client
        .get(gw.url("/custom"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["Custom T-shirts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let gw = start_gateway(test_config(100)).await;
    let token = gw.token("u1");

    let res = gw
        .client
        .post(gw.url("/users/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = gw
        .client
        .get(gw.url("/custom"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "token_revoked");
    assert_eq!(body["msg"], "Please Login");

    // Other sessions are unaffected.
    let res = gw
        .client
        .get(gw.url("/custom"))
        .bearer_auth(gw.token("u1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
