use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, redirect, Client, Response};

use secrecy::Secret;

use url::Url;

use wiremock::MockServer;

use optin::app;
use optin::client::{EmailClient, VerificationNotifier};
use optin::controller::{Pages, Policy, Routes, Subscriptions};
use optin::repo::InMemoryContactStore;
use optin::settings::PageSettings;

pub const PAGES_BASE_URL: &str = "https://www.example.com";

pub struct TestApp {
    addr: String,

    pub client: Client,
    pub email_server: MockServer,
    pub store: Arc<InMemoryContactStore>,
}

impl TestApp {
    pub async fn spawn(policy: Policy) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let email_server = MockServer::start().await;

        let email_client = {
            let sender = "list@test.com"
                .parse()
                .expect("Failed to parse sender email address");
            let api_base_url =
                Url::parse(&email_server.uri()).expect("Failed to parse mock server uri");
            let api_auth_token = Secret::new("TestAuthorization".into());
            let api_timeout = Duration::from_secs(2);

            EmailClient::new(sender, "Test List", api_timeout, api_base_url, api_auth_token)
                .expect("Failed to create email client")
        };

        let api_url = Url::parse(&format!("{}/", addr)).expect("Failed to parse app address");
        let notifier = VerificationNotifier::new(email_client, api_url, "verify");

        let pages = Pages::from(&PageSettings {
            base_url: PAGES_BASE_URL.into(),
            error_page: "/error/".into(),
            success_page: "/success/".into(),
            confirm_subscribe_page: "/confirm-subscribe/".into(),
            confirm_unsubscribe_page: "/confirm-unsubscribe/".into(),
        });

        let store = Arc::new(InMemoryContactStore::new());
        let workflow = Subscriptions::new(
            store.clone(),
            Arc::new(notifier),
            Routes::new("subscribe", "verify", "unsubscribe"),
            pages,
            policy,
        );

        let server =
            app::run(listener, Arc::new(workflow)).expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        // Redirects are asserted on, never followed
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            addr,
            client,
            email_server,
            store,
        }
    }

    pub async fn get(&self, path_and_query: &str) -> reqwest::Result<Response> {
        let url = format!("{}/{}", &self.addr, path_and_query.trim_start_matches('/'));
        self.client.get(url).send().await
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.get("health_check").await
    }

    pub async fn subscribe(&self, email: &str) -> reqwest::Result<Response> {
        self.client
            .get(format!("{}/subscribe/", &self.addr))
            .query(&[("email", email)])
            .send()
            .await
    }

    pub async fn unsubscribe(&self, email: &str, id: &str) -> reqwest::Result<Response> {
        self.client
            .get(format!("{}/unsubscribe/", &self.addr))
            .query(&[("email", email), ("id", id)])
            .send()
            .await
    }

    /// The verification links of the `n`th email sent, from the HTML and text bodies
    pub async fn verification_links(&self, n: usize) -> (String, String) {
        let requests = self.email_server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[n].body).unwrap();

        let html_link = extract_email_link(body["HtmlBody"].as_str().unwrap());
        let text_link = extract_email_link(body["TextBody"].as_str().unwrap());

        (html_link, text_link)
    }
}

/// Location header of a redirect
pub fn location(res: &Response) -> &str {
    res.headers()
        .get(header::LOCATION)
        .expect("Response is missing a Location header")
        .to_str()
        .unwrap()
}

pub fn page(path: &str) -> String {
    format!("{}{}", PAGES_BASE_URL, path)
}

pub fn extract_email_link(s: &str) -> String {
    let links: Vec<_> = linkify::LinkFinder::new()
        .links(s)
        .filter(|l| *l.kind() == linkify::LinkKind::Url)
        .collect();

    assert_eq!(1, links.len());

    links[0].as_str().to_owned()
}
