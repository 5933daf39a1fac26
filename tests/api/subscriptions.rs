use reqwest::{header, StatusCode};

use url::Url;

use wiremock::matchers::*;
use wiremock::{Mock, ResponseTemplate};

use optin::controller::Policy;

use crate::helpers::{location, page, TestApp};

async fn mount_email_ok(app: &TestApp, expected: u64) {
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(expected)
        .mount(&app.email_server)
        .await;
}

/// The `id` query value of a verification link
fn link_id(link: &str) -> String {
    let link = Url::parse(link).expect("Failed to parse verification link");
    link.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .expect("Verification link has no id")
}

#[tokio::test]
async fn subscribe_redirects_to_confirm_subscribe_page() {
    let app = TestApp::spawn(Policy::DoubleOptIn).await;
    mount_email_ok(&app, 1).await;

    let res = app
        .subscribe("new@example.com")
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::SEE_OTHER, res.status());
    assert_eq!(page("/confirm-subscribe/"), location(&res));
    assert_eq!(
        "*",
        res.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .expect("Response is missing the CORS header")
            .to_str()
            .unwrap()
    );

    let contact = app
        .store
        .contact("new@example.com")
        .expect("Contact was not stored");
    assert_eq!(Some(false), contact.confirm);
}

#[tokio::test]
async fn subscribe_sends_a_verification_email_with_link() {
    let app = TestApp::spawn(Policy::DoubleOptIn).await;
    mount_email_ok(&app, 1).await;

    app.subscribe("new@example.com")
        .await
        .expect("Failed to execute request");

    let (html_link, text_link) = app.verification_links(0).await;
    assert_eq!(html_link, text_link);

    let contact = app.store.contact("new@example.com").unwrap();
    assert_eq!(contact.id, link_id(&html_link));
}

#[tokio::test]
async fn subscribe_rejects_missing_or_malformed_email() {
    let app = TestApp::spawn(Policy::DoubleOptIn).await;
    mount_email_ok(&app, 0).await;

    let test_cases = vec![
        ("subscribe/", "missing email"),
        ("subscribe/?email=", "empty email"),
        ("subscribe/?email=not-an-address", "malformed email"),
    ];

    for (path_and_query, desc) in test_cases {
        let res = app
            .get(path_and_query)
            .await
            .expect("Failed to execute request");

        assert_eq!(
            page("/error/"),
            location(&res),
            "API did not fail when request had {}",
            desc
        );
    }
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn subscribe_lands_on_error_page_when_email_api_fails() {
    let app = TestApp::spawn(Policy::DoubleOptIn).await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let res = app
        .subscribe("new@example.com")
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::SEE_OTHER, res.status());
    assert_eq!(page("/error/"), location(&res));
    // The pending record is written before the email goes out
    assert!(app.store.contact("new@example.com").is_some());
}

#[tokio::test]
async fn verification_link_confirms_subscription() {
    let app = TestApp::spawn(Policy::DoubleOptIn).await;
    mount_email_ok(&app, 1).await;

    app.subscribe("new@example.com")
        .await
        .expect("Failed to execute request");
    let (link, _) = app.verification_links(0).await;

    let res = app
        .client
        .get(&link)
        .send()
        .await
        .expect("Failed to follow verification link");

    assert_eq!(StatusCode::SEE_OTHER, res.status());
    assert_eq!(page("/success/"), location(&res));

    let contact = app.store.contact("new@example.com").unwrap();
    assert_eq!(Some(true), contact.confirm);
}

#[tokio::test]
async fn verification_with_wrong_id_changes_nothing() {
    let app = TestApp::spawn(Policy::DoubleOptIn).await;
    mount_email_ok(&app, 1).await;

    app.subscribe("new@example.com")
        .await
        .expect("Failed to execute request");

    let res = app
        .get("verify/?email=new%40example.com&id=not-the-id")
        .await
        .expect("Failed to execute request");

    assert_eq!(page("/error/"), location(&res));
    let contact = app.store.contact("new@example.com").unwrap();
    assert_eq!(Some(false), contact.confirm);
}

#[tokio::test]
async fn resubscribing_replaces_the_id() {
    let app = TestApp::spawn(Policy::DoubleOptIn).await;
    mount_email_ok(&app, 2).await;

    for _ in 0..2 {
        let res = app
            .subscribe("new@example.com")
            .await
            .expect("Failed to execute request");
        assert_eq!(page("/confirm-subscribe/"), location(&res));
    }

    let (first, _) = app.verification_links(0).await;
    let (second, _) = app.verification_links(1).await;
    assert_ne!(link_id(&first), link_id(&second));

    // Only the latest link still verifies
    let res = app.client.get(&first).send().await.unwrap();
    assert_eq!(page("/error/"), location(&res));
    let res = app.client.get(&second).send().await.unwrap();
    assert_eq!(page("/success/"), location(&res));
    assert_eq!(1, app.store.len());
}

#[tokio::test]
async fn subscribe_verify_unsubscribe_lifecycle() {
    let app = TestApp::spawn(Policy::DoubleOptIn).await;
    mount_email_ok(&app, 1).await;

    app.subscribe("new@example.com")
        .await
        .expect("Failed to execute request");
    let (link, _) = app.verification_links(0).await;
    let id = link_id(&link);

    let res = app.client.get(&link).send().await.unwrap();
    assert_eq!(page("/success/"), location(&res));

    let res = app
        .unsubscribe("new@example.com", &id)
        .await
        .expect("Failed to execute request");
    assert_eq!(page("/confirm-unsubscribe/"), location(&res));
    assert!(app.store.contact("new@example.com").is_none());

    // A second unsubscribe finds nothing to remove
    let res = app
        .unsubscribe("new@example.com", &id)
        .await
        .expect("Failed to execute request");
    assert_eq!(page("/error/"), location(&res));
}

#[tokio::test]
async fn unknown_path_redirects_to_error_page() {
    let app = TestApp::spawn(Policy::DoubleOptIn).await;

    let res = app
        .get("signup/?email=new%40example.com")
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::SEE_OTHER, res.status());
    assert_eq!(page("/error/"), location(&res));
}

#[tokio::test]
async fn single_step_subscribe_requires_bot_check() {
    let app = TestApp::spawn(Policy::SingleStep).await;
    mount_email_ok(&app, 0).await;

    let res = app
        .get("subscribe/?email=new%40example.com")
        .await
        .expect("Failed to execute request");
    assert_eq!(page("/error/"), location(&res));
    assert!(app.store.is_empty());

    let res = app
        .get("subscribe/?email=new%40example.com&notbot=true")
        .await
        .expect("Failed to execute request");
    assert_eq!(page("/confirm-subscribe/"), location(&res));
    assert_eq!(1, app.store.len());
}

#[tokio::test]
async fn single_step_has_no_verify_route() {
    let app = TestApp::spawn(Policy::SingleStep).await;

    let res = app
        .get("verify/?email=new%40example.com&id=abc")
        .await
        .expect("Failed to execute request");

    assert_eq!(page("/error/"), location(&res));
}
