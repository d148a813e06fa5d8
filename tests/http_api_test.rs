mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use common::TestApp;

async fn app_with_accounts() -> (TestApp, String, String) {
    let app = TestApp::new();
    app.seed_user("admin", "admin-pass", true).await;
    app.seed_user("lucia", "lucia-pass", false).await;
    let admin = app.login("admin", "admin-pass").await;
    let user = app.login("lucia", "lucia-pass").await;
    (app, admin, user)
}

#[tokio::test]
async fn created_product_round_trips_through_the_listing() {
    let (app, admin, _) = app_with_accounts().await;

    let created = app
        .post(
            "/products",
            json!({"name": "Baguette", "price": 2.50, "quantity": 10}),
            Some(&admin),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK, "{}", created.body);
    assert_eq!(created.body["success"], true);
    let id = created.body["id"].as_i64().expect("server-assigned id");

    let first = app.get("/products", None).await;
    let second = app.get("/products", None).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, second.body);
    let products = first.body.as_array().expect("product array");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["id"], id);
    assert_eq!(products[0]["name"], "Baguette");
    assert_eq!(products[0]["price"], 2.5);
    assert_eq!(products[0]["quantity"], 10);
}

#[tokio::test]
async fn product_edits_require_an_admin() {
    let (app, _, user) = app_with_accounts().await;
    let id = app.seed_product("Baguette", 4).await;
    let path = format!("/products/{id}");

    let forbidden = app.request(Method::DELETE, &path, None, Some(&user)).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let anonymous = app.request(Method::DELETE, &path, None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let create = app
        .post("/products", json!({"name": "Rye", "price": 3, "quantity": 1}), Some(&user))
        .await;
    assert_eq!(create.status, StatusCode::FORBIDDEN);

    let listed = app.get("/products", None).await;
    assert_eq!(listed.body.as_array().map(Vec::len), Some(1));
    assert_eq!(app.stock(id).await, 4);
}

#[tokio::test]
async fn admin_can_update_and_delete_products() {
    let (app, admin, _) = app_with_accounts().await;
    let id = app.seed_product("Baguette", 4).await;
    let path = format!("/products/{id}");

    let updated = app
        .request(
            Method::PUT,
            &path,
            Some(json!({"name": "Baguette", "price": "3,10", "quantity": 9})),
            Some(&admin),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(app.stock(id).await, 9);

    let invalid = app
        .request(Method::PUT, &path, Some(json!({"name": "", "price": 1})), Some(&admin))
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let deleted = app.request(Method::DELETE, &path, None, Some(&admin)).await;
    assert_eq!(deleted.status, StatusCode::OK);

    let missing = app.request(Method::DELETE, &path, None, Some(&admin)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert!(missing.body["error"].is_string());
}

#[tokio::test]
async fn checkout_reports_insufficient_stock_and_changes_nothing() {
    let (app, _, user) = app_with_accounts().await;
    let id = app.seed_product("Baguette", 3).await;

    let response = app
        .post(
            "/cart/checkout",
            json!([{"id": id, "name": "Baguette", "price": 2.5, "quantity": 5}]),
            Some(&user),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["available"], 3);
    assert_eq!(response.body["requested"], 5);
    assert_eq!(app.stock(id).await, 3);

    let mine = app.get("/orders/mine", Some(&user)).await;
    assert_eq!(mine.body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn checkout_places_every_line_of_a_sufficient_cart() {
    let (app, _, user) = app_with_accounts().await;
    let baguette = app.seed_product("Baguette", 5).await;
    let croissant = app.seed_product("Croissant", 2).await;

    let response = app
        .post(
            "/cart/checkout",
            json!([
                {"id": baguette, "name": "Baguette", "price": 2.5, "quantity": 2},
                {"id": croissant, "name": "Croissant", "price": "1,20", "quantity": "1"}
            ]),
            Some(&user),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["lines"], 2);
    assert!(response.body["reference"].is_string());
    assert_eq!(app.stock(baguette).await, 3);
    assert_eq!(app.stock(croissant).await, 1);

    let mine = app.get("/orders/mine", Some(&user)).await;
    let lines = mine.body.as_array().expect("order lines");
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| line["customer"] == "lucia"));
    assert_eq!(lines[0]["name"], "Croissant");
    assert_eq!(lines[0]["price"], 1.2);
}

#[tokio::test]
async fn checkout_rejects_anonymous_and_malformed_carts() {
    let (app, _, user) = app_with_accounts().await;
    let id = app.seed_product("Baguette", 5).await;

    let anonymous = app
        .post("/cart/checkout", json!([{"id": id, "quantity": 1}]), None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let empty = app.post("/cart/checkout", json!([]), Some(&user)).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.body["error"], "cart is empty");

    let zero = app
        .post("/cart/checkout", json!([{"id": id, "quantity": "none"}]), Some(&user))
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);

    let unknown = app
        .post("/cart/checkout", json!({"items": [{"id": 999, "quantity": 1}]}), Some(&user))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    assert_eq!(app.stock(id).await, 5);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let (app, _, user) = app_with_accounts().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/cart/checkout")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, &user)
        .body(Body::from("[{not json"))
        .expect("Failed to build request");
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn order_listing_for_everyone_is_admin_only() {
    let (app, admin, user) = app_with_accounts().await;
    let id = app.seed_product("Baguette", 5).await;
    app.post("/cart/checkout", json!([{"id": id, "quantity": 1}]), Some(&user))
        .await;

    let denied = app.get("/orders", Some(&user)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let all = app.get("/orders", Some(&admin)).await;
    assert_eq!(all.status, StatusCode::OK);
    let lines = all.body.as_array().expect("order lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["customer"], "lucia");
}

#[tokio::test]
async fn register_login_and_logout() {
    let app = TestApp::new();

    let registered = app
        .post("/register", json!({"username": "ana", "password": "s3cret!"}), None)
        .await;
    assert_eq!(registered.status, StatusCode::OK, "{}", registered.body);

    let duplicate = app
        .post("/register", json!({"username": "ana", "password": "another"}), None)
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let short = app
        .post("/register", json!({"username": "ben", "password": "123"}), None)
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);

    let wrong = app
        .post("/login", json!({"username": "ana", "password": "wrong!"}), None)
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let login = app
        .post("/login", json!({"username": "ana", "password": "s3cret!"}), None)
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["redirect"], "/");
    assert_eq!(login.body["is_admin"], false);
    let cookie = login.cookie.expect("session cookie");

    let status = app.get("/session", Some(&cookie)).await;
    assert_eq!(status.body["logged_in"], true);
    assert_eq!(status.body["username"], "ana");

    let profile = app.get("/profile", Some(&cookie)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["username"], "ana");

    let logout = app.post("/logout", json!({}), Some(&cookie)).await;
    assert_eq!(logout.status, StatusCode::OK);

    let after = app.get("/session", Some(&cookie)).await;
    assert_eq!(after.body["logged_in"], false);
    let profile = app.get("/profile", Some(&cookie)).await;
    assert_eq!(profile.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_login_redirects_to_the_panel() {
    let (app, admin, user) = app_with_accounts().await;

    let login = app
        .post("/login", json!({"username": "admin", "password": "admin-pass"}), None)
        .await;
    assert_eq!(login.body["redirect"], "/admin");
    assert_eq!(login.body["is_admin"], true);

    let page = app.get("/admin", Some(&admin)).await;
    assert_eq!(page.status, StatusCode::OK);

    let denied = app.get("/admin", Some(&user)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_endpoints_report_ready() {
    let app = TestApp::new();

    let live = app.get("/health", None).await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, "ok");

    let ready = app.get("/health/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);
}
