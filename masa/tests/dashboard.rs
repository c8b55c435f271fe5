mod support;

use masa_core::ErrorKind;
use serde_json::{json, Value};
use support::TestContext;
use uuid::Uuid;

async fn category(ctx: &TestContext, token: &str, name: &str) -> Uuid {
    ctx.app
        .post("/api/dashboard/categories")
        .bearer(token)
        .json(&json!({ "name": name }))
        .send()
        .await
        .assert_created()
        .json_path("data.id")
}

async fn product(ctx: &TestContext, token: &str, category_id: Uuid, name: &str, price_cents: i64) -> Uuid {
    ctx.app
        .post("/api/dashboard/products")
        .bearer(token)
        .json(&json!({ "category_id": category_id, "name": name, "price_cents": price_cents }))
        .send()
        .await
        .assert_created()
        .json_path("data.id")
}

#[tokio::test]
async fn owner_manages_the_catalog() {
    let ctx = TestContext::new();
    let organization = ctx.organization("Çorbacı").await;
    let owner = ctx.tokens.owner(organization.id);

    let soups = category(&ctx, &owner, "Çorbalar").await;
    let drinks = category(&ctx, &owner, "İçecekler").await;
    let lentil = product(&ctx, &owner, soups, "Mercimek", 9000).await;
    product(&ctx, &owner, drinks, "Ayran", 3000).await;

    ctx.app
        .get(&format!("/api/dashboard/products?category_id={soups}"))
        .bearer(&owner)
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.len()", 1)
        .assert_json_path("data[0].name", "Mercimek");

    ctx.app
        .patch(&format!("/api/dashboard/products/{lentil}"))
        .bearer(&owner)
        .json(&json!({ "price_cents": 9500, "description": "Günün çorbası" }))
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.price_cents", 9500)
        .assert_json_path("data.description", "Günün çorbası");

    // An explicit null clears the field; omitting it leaves it alone.
    ctx.app
        .patch(&format!("/api/dashboard/products/{lentil}"))
        .bearer(&owner)
        .json(&json!({ "description": null }))
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.description", Value::Null)
        .assert_json_path("data.price_cents", 9500);

    ctx.app
        .delete(&format!("/api/dashboard/categories/{soups}"))
        .bearer(&owner)
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.deleted", true);

    ctx.app
        .get("/api/dashboard/products")
        .bearer(&owner)
        .send()
        .await
        .assert_json_path("data.len()", 1)
        .assert_json_path("data[0].name", "Ayran");
}

#[tokio::test]
async fn catalog_input_is_validated() {
    let ctx = TestContext::new();
    let organization = ctx.organization("Tatlıcı").await;
    let owner = ctx.tokens.owner(organization.id);
    let desserts = category(&ctx, &owner, "Tatlılar").await;

    ctx.app
        .post("/api/dashboard/products")
        .bearer(&owner)
        .json(&json!({ "category_id": desserts, "name": "Baklava", "price_cents": -1 }))
        .send()
        .await
        .assert_error(ErrorKind::Validation)
        .assert_json_path("error.fields[0].field", "price_cents");

    ctx.app
        .post("/api/dashboard/categories")
        .bearer(&owner)
        .json(&json!({ "name": "" }))
        .send()
        .await
        .assert_error(ErrorKind::Validation);
}

#[tokio::test]
async fn staff_read_but_do_not_write_the_catalog() {
    let ctx = TestContext::new();
    let organization = ctx.organization("Kebapçı").await;
    let owner = ctx.tokens.owner(organization.id);
    let staff = ctx.tokens.staff(organization.id);
    let grill = category(&ctx, &owner, "Izgara").await;
    let adana = product(&ctx, &owner, grill, "Adana", 42000).await;

    ctx.app
        .get("/api/dashboard/categories")
        .bearer(&staff)
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.len()", 1);

    ctx.app
        .post("/api/dashboard/categories")
        .bearer(&staff)
        .json(&json!({ "name": "Salatalar" }))
        .send()
        .await
        .assert_error(ErrorKind::PermissionDenied);

    ctx.app
        .delete(&format!("/api/dashboard/products/{adana}"))
        .bearer(&staff)
        .send()
        .await
        .assert_error(ErrorKind::PermissionDenied);

    // Sold out is a floor decision.
    ctx.app
        .put(&format!("/api/dashboard/products/{adana}/availability"))
        .bearer(&staff)
        .json(&json!({ "is_available": false }))
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.is_available", false);
}

#[tokio::test]
async fn products_cannot_point_at_foreign_categories() {
    let ctx = TestContext::new();
    let mine = ctx.organization("Birinci").await;
    let theirs = ctx.organization("İkinci").await;
    let foreign = category(&ctx, &ctx.tokens.owner(theirs.id), "Yabancı").await;

    ctx.app
        .post("/api/dashboard/products")
        .bearer(&ctx.tokens.owner(mine.id))
        .json(&json!({ "category_id": foreign, "name": "Lahmacun", "price_cents": 8000 }))
        .send()
        .await
        .assert_error(ErrorKind::NotFound);

    ctx.app
        .put(&format!("/api/dashboard/categories/{foreign}"))
        .bearer(&ctx.tokens.owner(mine.id))
        .json(&json!({ "name": "Benim" }))
        .send()
        .await
        .assert_error(ErrorKind::NotFound);
}

#[tokio::test]
async fn public_menu_reflects_catalog_changes() {
    let ctx = TestContext::new();
    let organization = ctx.organization("Ev Yemekleri").await;
    let owner = ctx.tokens.owner(organization.id);
    let mains = category(&ctx, &owner, "Ana Yemekler").await;
    let stew = product(&ctx, &owner, mains, "Kuru Fasulye", 15000).await;
    product(&ctx, &owner, mains, "Pilav", 6000).await;
    let path = format!("/api/menu/{}", organization.slug);

    ctx.app
        .get(&path)
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.organization.name", "Ev Yemekleri")
        .assert_json_path("data.categories.len()", 1)
        .assert_json_path("data.categories[0].name", "Ana Yemekler")
        .assert_json_path("data.categories[0].products.len()", 2);

    ctx.app
        .put(&format!("/api/dashboard/products/{stew}/availability"))
        .bearer(&ctx.tokens.staff(organization.id))
        .json(&json!({ "is_available": false }))
        .send()
        .await
        .assert_ok();

    ctx.app
        .get(&path)
        .send()
        .await
        .assert_json_path("data.categories[0].products.len()", 1)
        .assert_json_path("data.categories[0].products[0].name", "Pilav");

    ctx.app
        .patch(&format!("/api/dashboard/categories/{mains}"))
        .bearer(&owner)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .assert_ok();

    ctx.app
        .get(&path)
        .send()
        .await
        .assert_json_path("data.categories.len()", 0);
}

#[tokio::test]
async fn unknown_menu_is_not_found() {
    let ctx = TestContext::new();

    ctx.app
        .get("/api/menu/no-such-place")
        .locale("tr")
        .send()
        .await
        .assert_error(ErrorKind::NotFound);
}

#[tokio::test]
async fn tables_get_qr_links_that_can_be_rotated() {
    let ctx = TestContext::new();
    let organization = ctx.organization("Balıkçı").await;
    let owner = ctx.tokens.owner(organization.id);

    let table: Uuid = ctx
        .app
        .post("/api/dashboard/tables")
        .bearer(&owner)
        .json(&json!({ "name": "Teras 1", "capacity": 6 }))
        .send()
        .await
        .assert_created()
        .assert_json_path("data.capacity", 6)
        .assert_json_path("data.is_active", true)
        .json_path("data.id");

    let qr = ctx
        .app
        .get(&format!("/api/dashboard/tables/{table}/qr"))
        .bearer(&owner)
        .send()
        .await
        .assert_ok()
        .json_path::<Value>("data");
    let token = qr["qr_token"].as_str().unwrap().to_string();
    assert_eq!(
        qr["url"],
        format!("http://localhost:3000/m/{}?t={token}", organization.slug)
    );

    ctx.app
        .get(&format!("/api/menu/{}/tables/{token}", organization.slug))
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.table.name", "Teras 1")
        .assert_json_path("data.table.capacity", 6)
        .assert_json_path("data.menu.organization.slug", organization.slug.clone());

    let rotated: String = ctx
        .app
        .post(&format!("/api/dashboard/tables/{table}/qr/rotate"))
        .bearer(&owner)
        .send()
        .await
        .assert_ok()
        .json_path("data.qr_token");
    assert_ne!(rotated, token);

    ctx.app
        .get(&format!("/api/menu/{}/tables/{token}", organization.slug))
        .send()
        .await
        .assert_error(ErrorKind::NotFound);
    ctx.app
        .get(&format!("/api/menu/{}/tables/{rotated}", organization.slug))
        .send()
        .await
        .assert_ok();
}

#[tokio::test]
async fn table_rules() {
    let ctx = TestContext::new();
    let organization = ctx.organization("Meyhane").await;
    let staff = ctx.tokens.staff(organization.id);
    let owner = ctx.tokens.owner(organization.id);
    let table = ctx.table(organization.id, "Bahçe").await;

    ctx.app
        .post("/api/dashboard/tables")
        .bearer(&owner)
        .json(&json!({ "name": "Dev", "capacity": 0 }))
        .send()
        .await
        .assert_error(ErrorKind::Validation);

    ctx.app
        .post(&format!("/api/dashboard/tables/{}/qr/rotate", table.id))
        .bearer(&staff)
        .send()
        .await
        .assert_error(ErrorKind::PermissionDenied);

    ctx.app
        .delete(&format!("/api/dashboard/tables/{}", table.id))
        .bearer(&owner)
        .send()
        .await
        .assert_ok();

    ctx.app
        .get(&format!("/api/dashboard/tables/{}", table.id))
        .bearer(&owner)
        .send()
        .await
        .assert_error(ErrorKind::NotFound);
}

#[tokio::test]
async fn settings_patches_merge() {
    let ctx = TestContext::new();
    let organization = ctx.organization("Sofra").await;
    let owner = ctx.tokens.owner(organization.id);

    ctx.app
        .patch("/api/dashboard/settings")
        .bearer(&owner)
        .json(&json!({ "currency": "TRY", "hours": { "open": "09:00", "close": "23:00" } }))
        .send()
        .await
        .assert_ok();

    ctx.app
        .patch("/api/dashboard/settings")
        .bearer(&owner)
        .json(&json!({ "hours": { "close": "01:00" }, "currency": null, "private": { "iban": "TR00" } }))
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.hours.open", "09:00")
        .assert_json_path("data.hours.close", "01:00")
        .assert_json_path_fn("data", |data| data.get("currency").is_none());

    // Private settings never reach guests.
    ctx.app
        .get(&format!("/api/menu/{}", organization.slug))
        .send()
        .await
        .assert_json_path("data.organization.settings.hours.close", "01:00")
        .assert_json_path_fn("data.organization.settings", |settings| settings.get("private").is_none());
}

#[tokio::test]
async fn settings_need_an_owner_and_an_object() {
    let ctx = TestContext::new();
    let organization = ctx.organization("Pideci").await;

    ctx.app
        .patch("/api/dashboard/theme")
        .bearer(&ctx.tokens.staff(organization.id))
        .json(&json!({ "primary": "#b91c1c" }))
        .send()
        .await
        .assert_error(ErrorKind::PermissionDenied);

    ctx.app
        .patch("/api/dashboard/theme")
        .bearer(&ctx.tokens.owner(organization.id))
        .json(&json!(["#b91c1c"]))
        .send()
        .await
        .assert_error(ErrorKind::Validation);

    ctx.app
        .get("/api/dashboard/theme")
        .bearer(&ctx.tokens.staff(organization.id))
        .send()
        .await
        .assert_ok()
        .assert_json_path("data", json!({}));
}

#[tokio::test]
async fn legal_texts_are_stamped() {
    let ctx = TestContext::new();
    let organization = ctx.organization("Lokanta").await;

    ctx.app
        .patch("/api/dashboard/legal")
        .bearer(&ctx.tokens.owner(organization.id))
        .json(&json!({ "kvkk": "Kişisel verileriniz korunur." }))
        .send()
        .await
        .assert_ok()
        .assert_json_path_fn("data.updated_at", Value::is_string);

    ctx.app
        .get(&format!("/api/menu/{}/legal", organization.slug))
        .send()
        .await
        .assert_ok()
        .assert_json_path("data.kvkk", "Kişisel verileriniz korunur.")
        .assert_json_path_fn("data.updated_at", Value::is_string);
}

#[tokio::test]
async fn health_is_public() {
    let ctx = TestContext::new();

    ctx.app.get("/health").send().await.assert_ok();
}
