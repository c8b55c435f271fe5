mod support;

use masa_core::ErrorKind;
use masa_data::Role;
use serde_json::{json, Value};
use support::TestContext;
use uuid::Uuid;

fn registration(email: &str, organization_name: &str) -> Value {
    json!({
        "email": email,
        "password": "correct-horse",
        "full_name": "Ayşe Yılmaz",
        "organization_name": organization_name,
    })
}

async fn register(ctx: &TestContext, email: &str, organization_name: &str) -> Value {
    ctx.app
        .post("/api/auth/register")
        .json(&registration(email, organization_name))
        .send()
        .await
        .assert_created()
        .json_path::<Value>("data")
}

async fn login(ctx: &TestContext, email: &str, password: &str) -> masa_test::TestResponse {
    ctx.app
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
}

#[tokio::test]
async fn registration_creates_owner_and_organization() {
    let ctx = TestContext::new();
    let session = register(&ctx, "Ayse@Example.com", "Çınaraltı Köfte").await;

    assert_eq!(session["organization"]["slug"], "cinaralti-kofte");
    assert_eq!(session["profile"]["role"], "owner");
    assert_eq!(session["profile"]["email"], "ayse@example.com");
    assert!(session["profile"].get("password_hash").is_none());

    let token = session["token"].as_str().unwrap();
    ctx.app
        .get("/api/auth/me")
        .bearer(token)
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.organization_id", session["organization"]["id"].clone())
        .assert_json_path("data.full_name", "Ayşe Yılmaz");
}

#[tokio::test]
async fn colliding_slugs_get_a_suffix() {
    let ctx = TestContext::new();
    let first = register(&ctx, "first@example.com", "Deniz Balık").await;
    let second = register(&ctx, "second@example.com", "Deniz  Balık!").await;

    assert_eq!(first["organization"]["slug"], "deniz-balik");
    assert_eq!(second["organization"]["slug"], "deniz-balik-2");
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let ctx = TestContext::new();
    register(&ctx, "owner@example.com", "Birinci").await;

    ctx.app
        .post("/api/auth/register")
        .json(&registration("OWNER@example.com", "İkinci"))
        .send()
        .await
        .assert_error(ErrorKind::Validation)
        .assert_json_path("error.message", "An account with this email already exists.");
}

#[tokio::test]
async fn registration_validates_fields() {
    let ctx = TestContext::new();

    ctx.app
        .post("/api/auth/register")
        .json(&json!({
            "email": "not-an-email",
            "password": "short",
            "full_name": "A",
            "organization_name": "B",
        }))
        .send()
        .await
        .assert_error(ErrorKind::Validation)
        .assert_json_path("error.fields.len()", 2);
}

#[tokio::test]
async fn login_checks_the_password() {
    let ctx = TestContext::new();
    register(&ctx, "owner@example.com", "Sofra").await;

    login(&ctx, "owner@example.com", "correct-horse")
        .await
        .assert_ok()
        .assert_json_path_fn("data.token", Value::is_string)
        .assert_json_path("data.organization.slug", "sofra");

    login(&ctx, "owner@example.com", "wrong-horse")
        .await
        .assert_error(ErrorKind::PermissionDenied)
        .assert_json_path("error.message", "Invalid email or password.");

    login(&ctx, "nobody@example.com", "correct-horse")
        .await
        .assert_error(ErrorKind::PermissionDenied)
        .assert_json_path("error.message", "Invalid email or password.");
}

#[tokio::test]
async fn login_failure_is_localized() {
    let ctx = TestContext::new();

    ctx.app
        .post("/api/auth/login")
        .locale("tr")
        .json(&json!({ "email": "nobody@example.com", "password": "whatever1" }))
        .send()
        .await
        .assert_error(ErrorKind::PermissionDenied)
        .assert_json_path("error.message", "E-posta veya şifre hatalı.");
}

#[tokio::test]
async fn password_reset_token_works_once() {
    let ctx = TestContext::new();
    register(&ctx, "owner@example.com", "Lokanta").await;

    ctx.app
        .post("/api/auth/password-reset/request")
        .json(&json!({ "email": "owner@example.com" }))
        .send()
        .await
        .assert_accepted()
        .assert_json_path("data.sent", true);
    let token = ctx.mailer.last_token_for("owner@example.com").unwrap();

    ctx.app
        .post("/api/auth/password-reset/confirm")
        .json(&json!({ "token": token, "new_password": "brand-new-pass" }))
        .send()
        .await
        .assert_ok();

    login(&ctx, "owner@example.com", "correct-horse")
        .await
        .assert_error(ErrorKind::PermissionDenied);
    login(&ctx, "owner@example.com", "brand-new-pass").await.assert_ok();

    ctx.app
        .post("/api/auth/password-reset/confirm")
        .json(&json!({ "token": token, "new_password": "another-pass" }))
        .send()
        .await
        .assert_error(ErrorKind::Validation);
}

#[tokio::test]
async fn expired_reset_token_is_rejected() {
    let ctx = TestContext::new();
    register(&ctx, "owner@example.com", "Meyhane").await;

    ctx.app
        .post("/api/auth/password-reset/request")
        .json(&json!({ "email": "owner@example.com" }))
        .send()
        .await
        .assert_accepted();
    let token = ctx.mailer.last_token_for("owner@example.com").unwrap();

    ctx.clock.advance(chrono::Duration::hours(2));
    ctx.app
        .post("/api/auth/password-reset/confirm")
        .json(&json!({ "token": token, "new_password": "brand-new-pass" }))
        .send()
        .await
        .assert_error(ErrorKind::Validation);
}

#[tokio::test]
async fn reset_request_does_not_reveal_unknown_emails() {
    let ctx = TestContext::new();

    ctx.app
        .post("/api/auth/password-reset/request")
        .json(&json!({ "email": "ghost@example.com" }))
        .send()
        .await
        .assert_accepted()
        .assert_json_path("data.sent", true);
    assert_eq!(ctx.mailer.count(), 0);
}

#[tokio::test]
async fn admin_endpoints_require_superadmin() {
    let ctx = TestContext::new();
    let organization = ctx.organization("Pideci").await;

    ctx.app
        .get("/api/admin/users")
        .bearer(&ctx.tokens.owner(organization.id))
        .send()
        .await
        .assert_error(ErrorKind::PermissionDenied);

    ctx.app
        .get("/api/admin/organizations")
        .bearer(&ctx.tokens.superadmin())
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.len()", 1)
        .assert_json_path("data[0].slug", "pideci");
}

#[tokio::test]
async fn superadmin_manages_users() {
    let ctx = TestContext::new();
    let organization = ctx.organization("Kebapçı").await;
    let admin = ctx.tokens.superadmin();

    let created = ctx
        .app
        .post("/api/admin/users")
        .bearer(&admin)
        .json(&json!({
            "email": "garson@example.com",
            "password": "garson-pass",
            "full_name": "Mehmet Garson",
            "role": "staff",
            "organization_id": organization.id,
        }))
        .send()
        .await
        .assert_created()
        .assert_json_path("data.role", "staff")
        .json_path::<Uuid>("data.id");

    login(&ctx, "garson@example.com", "garson-pass").await.assert_ok();

    ctx.app
        .post(&format!("/api/admin/users/{created}/superadmin"))
        .bearer(&admin)
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.role", "superadmin");

    ctx.app
        .delete(&format!("/api/admin/users/{created}/superadmin"))
        .bearer(&admin)
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.role", Role::Owner.as_str());

    ctx.app
        .post(&format!("/api/admin/users/{created}/reset-password"))
        .bearer(&admin)
        .json(&json!({ "new_password": "reset-by-admin" }))
        .send()
        .await
        .assert_ok();
    login(&ctx, "garson@example.com", "reset-by-admin").await.assert_ok();
}

#[tokio::test]
async fn staff_accounts_need_an_existing_organization() {
    let ctx = TestContext::new();
    let admin = ctx.tokens.superadmin();
    let user = |organization_id: Option<Uuid>| {
        json!({
            "email": "someone@example.com",
            "password": "some-password",
            "full_name": "Someone",
            "role": "owner",
            "organization_id": organization_id,
        })
    };

    ctx.app
        .post("/api/admin/users")
        .bearer(&admin)
        .json(&user(None))
        .send()
        .await
        .assert_error(ErrorKind::Validation);

    ctx.app
        .post("/api/admin/users")
        .bearer(&admin)
        .json(&user(Some(Uuid::new_v4())))
        .send()
        .await
        .assert_error(ErrorKind::NotFound);
}

#[tokio::test]
async fn unknown_users_cannot_be_promoted() {
    let ctx = TestContext::new();

    ctx.app
        .post(&format!("/api/admin/users/{}/superadmin", Uuid::new_v4()))
        .bearer(&ctx.tokens.superadmin())
        .send()
        .await
        .assert_error(ErrorKind::NotFound);

    ctx.app
        .post("/api/admin/users/not-a-uuid/superadmin")
        .bearer(&ctx.tokens.superadmin())
        .send()
        .await
        .assert_error(ErrorKind::Validation);
}
