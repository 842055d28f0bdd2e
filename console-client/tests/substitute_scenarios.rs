use std::sync::Arc;

use common_auth::{CookieJar, CredentialStore, Role, SessionConfig, SessionResolver, SessionState};
use common_security::{select_screen, Screen, TabNavigator};
use console_client::data::{Category, Product};
use console_client::{ApiError, DataService, FileUpload, SubstituteSource};
use serde_json::json;

struct Substitute {
    data: DataService,
    session: Arc<SessionResolver>,
    jar: Arc<CookieJar>,
}

fn substitute() -> Substitute {
    let config = SessionConfig::default();
    let jar = Arc::new(CookieJar::new(&config));
    let session = Arc::new(SessionResolver::new(jar.clone(), &config));
    let source = SubstituteSource::new(session.clone(), config.ttl_hours);
    Substitute {
        data: DataService::new(Arc::new(source)),
        session,
        jar,
    }
}

#[tokio::test]
async fn manager_sees_every_tab_and_the_full_catalogue() {
    let env = substitute();
    env.session.resolve();

    let principal = env.data.login("manager", "manager123").await.expect("login");
    assert_eq!(principal.role, Role::Manager);
    assert!(env.jar.read().is_some());

    let navigator = TabNavigator::for_principal(&principal);
    assert_eq!(
        navigator.tabs(),
        &[Screen::Categories, Screen::Subcategories, Screen::Products, Screen::Couriers]
    );
    assert_eq!(navigator.active(), Screen::Categories);

    let categories = env.data.categories().await.expect("categories");
    assert_eq!(categories.len(), 3);
    assert_eq!(env.data.cities().await.expect("cities").len(), 5);
}

#[tokio::test]
async fn courier_lands_on_products_with_own_cities() {
    let env = substitute();

    let principal = env.data.login("courier1", "courier123").await.expect("login");
    assert_eq!(principal.role, Role::Courier);
    assert_eq!(select_screen(principal.role, Screen::Categories), Screen::Products);
    assert_eq!(select_screen(principal.role, Screen::Couriers), Screen::Products);

    let cities = env.data.cities().await.expect("cities");
    assert_eq!(cities, vec!["Bocholt", "Köln"]);
}

#[tokio::test]
async fn wrong_password_is_rejected_and_session_stays_anonymous() {
    let env = substitute();
    env.session.resolve();

    let err = env
        .data
        .login("manager", "wrong")
        .await
        .expect_err("rejected");
    assert_eq!(err.message(), "Invalid login or password");
    assert_eq!(env.session.snapshot(), SessionState::Anonymous);
    assert!(env.jar.read().is_none());
}

#[tokio::test]
async fn unrepresentable_token_lifetime_fails_the_login_cleanly() {
    let config = SessionConfig::default();
    let jar = Arc::new(CookieJar::new(&config));
    let session = Arc::new(SessionResolver::new(jar.clone(), &config));
    let data = DataService::new(Arc::new(SubstituteSource::new(session.clone(), u32::MAX)));

    let err = data
        .login("manager", "manager123")
        .await
        .expect_err("lifetime overflows");
    assert!(matches!(err, ApiError::LoginRejected { status: None }));
    assert!(!session.is_authenticated());
    assert!(jar.read().is_none());
}

#[tokio::test]
async fn crud_round_through_the_substitute() {
    let env = substitute();
    env.data.login("manager", "manager123").await.expect("login");

    let created: Category = env
        .data
        .create(&json!({ "name": "Tiefkühl", "image": null }))
        .await
        .expect("created");
    assert!(!created.id.is_empty());
    assert_eq!(env.data.categories().await.expect("list").len(), 4);

    let renamed: Category = env
        .data
        .update(&created.id, &json!({ "name": "Tiefkühlkost", "id": "hijack" }))
        .await
        .expect("updated");
    assert_eq!(renamed.id, created.id);
    assert_eq!(renamed.name, "Tiefkühlkost");

    let repriced: Product = env
        .data
        .update("1", &json!({ "price": 0.99 }))
        .await
        .expect("product updated");
    assert_eq!(repriced.name, "Mineralwasser 1,5 l");
    assert!((repriced.price - 0.99).abs() < f64::EPSILON);

    env.data
        .delete::<Category>(&created.id)
        .await
        .expect("deleted");
    let err = env
        .data
        .delete::<Category>(&created.id)
        .await
        .expect_err("already gone");
    assert_eq!(err.status(), Some(404));

    let err = env
        .data
        .update::<Product, _>("missing", &json!({ "price": 1.0 }))
        .await
        .expect_err("missing");
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn uploads_return_a_unique_name() {
    let env = substitute();

    let first = env
        .data
        .upload_image(FileUpload::new("logo.png", b"png".to_vec()))
        .await
        .expect("uploaded");
    let second = env
        .data
        .upload_image(FileUpload::new("logo.png", b"png".to_vec()))
        .await
        .expect("uploaded");
    assert!(first.ends_with("-logo.png"));
    assert_ne!(first, second);
    assert_eq!(env.data.image_url(&first), first);

    let err = env
        .data
        .upload_image(FileUpload::new("empty.png", Vec::new()))
        .await
        .expect_err("empty");
    assert!(matches!(err, ApiError::Status { status: 400, .. }));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let env = substitute();
    env.data.login("courier1", "courier123").await.expect("login");

    env.data.logout().await.expect("first logout");
    env.data.logout().await.expect("second logout");

    assert_eq!(env.session.snapshot(), SessionState::Anonymous);
    assert!(env.jar.read().is_none());
    assert!(env.session.current_user().is_none());
}

#[tokio::test]
async fn relogin_replaces_the_principal() {
    let env = substitute();
    env.data.login("courier1", "courier123").await.expect("courier");
    let manager = env.data.login("manager", "manager123").await.expect("manager");

    assert_eq!(env.session.current_user(), Some(manager));
    assert_eq!(env.data.cities().await.expect("cities").len(), 5);
}
