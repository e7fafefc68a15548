//! Registration, login and logout through the HTTP surface

mod common;

use axum::http::StatusCode;
use common::TestClient;

#[tokio::test]
async fn test_register_success_logs_in() {
    let mut client = TestClient::new();

    let response = client.register("ren@example.com", "ren", "purple-monkey").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/urls"));
    assert!(client.has_session());

    let response = client.get("/urls").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Logged in as ren"));
}

#[tokio::test]
async fn test_register_blank_field_rejected() {
    let mut client = TestClient::new();

    let response = client.register("", "a", "b").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("Email, username and password are all required."));

    let response = client.register("a@example.com", "a", "   ").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let users = client.get("/users.json").await.json();
    assert_eq!(users.as_object().unwrap().len(), 0);

    // still anonymous
    let response = client.get("/urls").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_duplicate_email_rejected() {
    let mut first = TestClient::new();
    first.register("stimpy@example.com", "stimpy", "dishwasher-funk").await;

    let mut second = first.other_visitor();
    let response = second.register("Stimpy@Example.com", "impostor", "hunter2").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("That email is already registered."));

    let users = second.get("/users.json").await.json();
    assert_eq!(users.as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_duplicate_username_rejected() {
    let mut first = TestClient::new();
    first.register("one@example.com", "ren", "pw-one").await;

    let mut second = first.other_visitor();
    let response = second.register("two@example.com", "ren", "pw-two").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.contains("That username is already taken."));

    let users = second.get("/users.json").await.json();
    assert_eq!(users.as_object().unwrap().len(), 1);

    // the username still logs in the account that owns it
    let mut client = first.other_visitor();
    let response = client
        .post_form("/login", &[("username", "ren"), ("password", "pw-one")])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    // and the rejected registrant can pick another name
    let response = second.register("two@example.com", "ren2", "pw-two").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let mut client = first.other_visitor();
    let response = client
        .post_form("/login", &[("username", "ren2"), ("password", "pw-two")])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_login_unknown_user() {
    let mut client = TestClient::new();

    let response = client
        .post_form("/login", &[("username", "ghost@x.com"), ("password", "x")])
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.body.contains("No user with that email or username."));
}

#[tokio::test]
async fn test_login_wrong_password() {
    let mut client = TestClient::new();
    client.register("ren@example.com", "ren", "purple-monkey").await;
    client.post_form("/logout", &[]).await;

    let response = client
        .post_form("/login", &[("username", "ren@example.com"), ("password", "nope")])
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.body.contains("Incorrect password."));

    let response = client.get("/urls").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_email_or_username() {
    let mut registrar = TestClient::new();
    registrar.register("ren@example.com", "ren", "purple-monkey").await;

    for identifier in ["ren@example.com", "ren"] {
        let mut client = registrar.other_visitor();
        let response = client
            .post_form("/login", &[("username", identifier), ("password", "purple-monkey")])
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "login as {identifier}");
        assert_eq!(response.location.as_deref(), Some("/urls"));

        let response = client.get("/urls").await;
        assert_eq!(response.status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_logout_clears_session() {
    let mut client = TestClient::new();
    client.register("ren@example.com", "ren", "purple-monkey").await;

    let response = client.post_form("/logout", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/login"));

    let response = client.get("/urls").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.body.contains("You have to log in to view your URLs!"));
}

#[tokio::test]
async fn test_logged_in_user_skips_login_and_register_pages() {
    let mut client = TestClient::new();
    client.register("ren@example.com", "ren", "purple-monkey").await;

    for page in ["/login", "/register"] {
        let response = client.get(page).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(response.location.as_deref(), Some("/urls"));
    }
}

#[tokio::test]
async fn test_users_json_hides_password_hashes() {
    let mut client = TestClient::new();
    client.register("ren@example.com", "ren", "purple-monkey").await;

    let response = client.get("/users.json").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.body.contains("passwordHash"));
    assert!(!response.body.contains("argon2"));

    let users = response.json();
    let user = users.as_object().unwrap().values().next().unwrap();
    assert_eq!(user["email"], "ren@example.com");
    assert_eq!(user["id"].as_str().unwrap().len(), 6);
}
