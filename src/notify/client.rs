//! HTTP client for the Farcaster notification service
//!
//! Two calls are used:
//! - bulk user lookup by verified address (`GET /v2/farcaster/user/bulk-by-address`)
//! - frame notification publish (`POST /v2/farcaster/frame/notifications`)

use async_trait::async_trait;
use ethers::types::Address;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::message::{Identity, NotificationMessage};
use super::Notifier;
use crate::config::{KeeperConfig, Tuning};
use crate::core::constants::IDENTITY_LOOKUP_CHUNK;
use crate::error::NotifyError;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct UserRecord {
    fid: u64,
    #[serde(default)]
    username: Option<String>,
}

pub struct NotificationClient {
    http: Client,
    base_url: Url,
    api_key: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl NotificationClient {
    pub fn new(config: &KeeperConfig, tuning: &Tuning) -> Result<Self, NotifyError> {
        Self::with_base_url(
            config.notify_base_url.clone(),
            config.notify_api_key.clone(),
            tuning,
        )
    }

    /// `base_url` must end with `/` so endpoint paths join below it
    pub fn with_base_url(
        base_url: Url,
        api_key: impl Into<String>,
        tuning: &Tuning,
    ) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(tuning.notify.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            max_retries: tuning.notify.max_retries,
            retry_delay: Duration::from_millis(tuning.notify.retry_delay_ms),
        })
    }

    async fn with_retries<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> Result<T, NotifyError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, NotifyError>>,
    {
        let mut attempt = 0;
        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Notification request failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn lookup_chunk(&self, addresses: &[Address]) -> Result<HashMap<Address, Vec<Identity>>, NotifyError> {
        let mut url = self.base_url.join("v2/farcaster/user/bulk-by-address")?;
        let joined = addresses
            .iter()
            .map(|a| format!("{:?}", a))
            .collect::<Vec<_>>()
            .join(",");
        url.query_pairs_mut().append_pair("addresses", &joined);

        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        // The lookup answers 404 when none of the addresses belong to a user
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(HashMap::new());
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status { status, body });
        }

        let records: HashMap<String, Vec<UserRecord>> = response.json().await?;
        let mut resolved = HashMap::new();
        for (address, users) in records {
            match address.parse::<Address>() {
                Ok(address) => {
                    let identities = users
                        .into_iter()
                        .map(|u| Identity {
                            fid: u.fid,
                            username: u.username,
                        })
                        .collect();
                    resolved.insert(address, identities);
                }
                Err(_) => debug!(address = %address, "Skipping unparseable address in lookup response"),
            }
        }
        Ok(resolved)
    }

    async fn publish(&self, target_fids: &[u64], message: &NotificationMessage) -> Result<(), NotifyError> {
        let url = self.base_url.join("v2/farcaster/frame/notifications")?;
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({
                "target_fids": target_fids,
                "notification": message,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for NotificationClient {
    async fn resolve_identities(
        &self,
        addresses: &[Address],
    ) -> Result<HashMap<Address, Vec<Identity>>, NotifyError> {
        let mut resolved = HashMap::new();
        for chunk in addresses.chunks(IDENTITY_LOOKUP_CHUNK) {
            let found = self
                .with_retries("resolve_identities", || self.lookup_chunk(chunk))
                .await?;
            resolved.extend(found);
        }
        debug!(
            requested = addresses.len(),
            resolved = resolved.len(),
            "Resolved participant identities"
        );
        Ok(resolved)
    }

    async fn send_notification(
        &self,
        targets: &[Identity],
        message: &NotificationMessage,
    ) -> Result<(), NotifyError> {
        let fids: Vec<u64> = targets.iter().map(|t| t.fid).collect();
        self.with_retries("send_notification", || self.publish(&fids, message))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode as AxumStatus, routing::{get, post}, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct Stub {
        lookup_status: AxumStatus,
        lookup_body: serde_json::Value,
        publish_status: AxumStatus,
        lookups: Arc<AtomicUsize>,
        publishes: Arc<AtomicUsize>,
    }

    impl Stub {
        fn new(lookup_status: AxumStatus, publish_status: AxumStatus) -> Self {
            Self {
                lookup_status,
                lookup_body: serde_json::json!({}),
                publish_status,
                lookups: Arc::new(AtomicUsize::new(0)),
                publishes: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    async fn lookup(State(stub): State<Stub>) -> (AxumStatus, Json<serde_json::Value>) {
        stub.lookups.fetch_add(1, Ordering::SeqCst);
        (stub.lookup_status, Json(stub.lookup_body.clone()))
    }

    async fn publish(State(stub): State<Stub>) -> (AxumStatus, Json<serde_json::Value>) {
        stub.publishes.fetch_add(1, Ordering::SeqCst);
        (stub.publish_status, Json(serde_json::json!({})))
    }

    /// Serve the stub on an ephemeral port and return a client pointed at it
    async fn client_for(stub: Stub, max_retries: u32) -> NotificationClient {
        let router = Router::new()
            .route("/v2/farcaster/user/bulk-by-address", get(lookup))
            .route("/v2/farcaster/frame/notifications", post(publish))
            .with_state(stub);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let mut tuning = Tuning::default();
        tuning.notify.max_retries = max_retries;
        tuning.notify.retry_delay_ms = 0;
        let base_url = Url::parse(&format!("http://{}/", addr)).unwrap();
        NotificationClient::with_base_url(base_url, "test-key", &tuning).unwrap()
    }

    fn message() -> NotificationMessage {
        NotificationMessage {
            title: "Potluck payout is in!".to_string(),
            body: "Round 1 has been paid out.".to_string(),
            target_url: "https://potluck.app/pot/1".to_string(),
        }
    }

    fn target(fid: u64) -> Identity {
        Identity {
            fid,
            username: None,
        }
    }

    #[tokio::test]
    async fn test_lookup_not_found_means_no_users() {
        let stub = Stub::new(AxumStatus::NOT_FOUND, AxumStatus::OK);
        let lookups = stub.lookups.clone();
        let client = client_for(stub, 3).await;

        let resolved = client
            .resolve_identities(&[Address::repeat_byte(0x11)])
            .await
            .unwrap();

        assert!(resolved.is_empty());
        assert_eq!(lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lookup_parses_lowercase_address_keys() {
        let alice = Address::repeat_byte(0xab);
        let bob = Address::repeat_byte(0xcd);
        let alice_key = format!("{:?}", alice).to_lowercase();
        let bob_key = format!("{:?}", bob).to_lowercase();
        let mut stub = Stub::new(AxumStatus::OK, AxumStatus::OK);
        stub.lookup_body = serde_json::json!({
            alice_key: [
                {"fid": 7, "username": "alice"},
                {"fid": 8}
            ],
            bob_key: [{"fid": 9, "username": "bob"}],
            "not-an-address": [{"fid": 10}]
        });
        let client = client_for(stub, 0).await;

        let resolved = client.resolve_identities(&[alice, bob]).await.unwrap();

        assert_eq!(resolved.len(), 2);
        let alice_fids: Vec<u64> = resolved[&alice].iter().map(|i| i.fid).collect();
        assert_eq!(alice_fids, vec![7, 8]);
        assert_eq!(resolved[&alice][0].username.as_deref(), Some("alice"));
        assert_eq!(resolved[&alice][1].username, None);
        assert_eq!(resolved[&bob][0].fid, 9);
    }

    #[tokio::test]
    async fn test_lookup_is_chunked() {
        let stub = Stub::new(AxumStatus::NOT_FOUND, AxumStatus::OK);
        let lookups = stub.lookups.clone();
        let client = client_for(stub, 0).await;
        let addresses: Vec<Address> = (0..IDENTITY_LOOKUP_CHUNK as u64 + 1)
            .map(Address::from_low_u64_be)
            .collect();

        client.resolve_identities(&addresses).await.unwrap();

        assert_eq!(lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unavailable_publish_is_retried_until_exhausted() {
        let stub = Stub::new(AxumStatus::OK, AxumStatus::SERVICE_UNAVAILABLE);
        let publishes = stub.publishes.clone();
        let client = client_for(stub, 3).await;

        let err = client
            .send_notification(&[target(1), target(2)], &message())
            .await
            .unwrap_err();

        assert!(matches!(err, NotifyError::Status { status: 503, .. }));
        assert_eq!(publishes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_bad_request_is_not_retried() {
        let stub = Stub::new(AxumStatus::OK, AxumStatus::BAD_REQUEST);
        let publishes = stub.publishes.clone();
        let client = client_for(stub, 3).await;

        let err = client
            .send_notification(&[target(1)], &message())
            .await
            .unwrap_err();

        assert!(matches!(err, NotifyError::Status { status: 400, .. }));
        assert_eq!(publishes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_successful_publish_is_sent_once() {
        let stub = Stub::new(AxumStatus::OK, AxumStatus::OK);
        let publishes = stub.publishes.clone();
        let client = client_for(stub, 3).await;

        client
            .send_notification(&[target(1)], &message())
            .await
            .unwrap();

        assert_eq!(publishes.load(Ordering::SeqCst), 1);
    }
}
