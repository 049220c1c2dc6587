use std::time::Duration;

use anyhow::Result;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;

use super::types::Endpoint;

const BROADCAST_TIMEOUT: Duration = Duration::from_secs(1);

/// Fan-out helper over a membership snapshot.
///
/// Delivery is at-least-once at best: one attempt per target with a short
/// timeout, failures logged and dropped. Gossip and compaction reconcile
/// whatever a lost broadcast leaves behind.
#[derive(Clone)]
pub struct Broadcaster {
    client: reqwest::Client,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Issues one request to a single peer.
    pub async fn send(
        &self,
        target: &Endpoint,
        path: &str,
        method: Method,
        body: String,
        json: bool,
    ) -> Result<reqwest::Response> {
        let url = format!("http://{}{}", target, path);
        let content_type = if json {
            "application/json"
        } else {
            "application/x-www-form-urlencoded"
        };

        let response = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .timeout(BROADCAST_TIMEOUT)
            .send()
            .await?;

        Ok(response)
    }

    /// Sends the request to every target except `skip` (the caller itself).
    pub async fn broadcast(
        &self,
        targets: &[Endpoint],
        skip: &Endpoint,
        path: &str,
        method: Method,
        body: &str,
        json: bool,
    ) {
        for target in targets {
            if target == skip {
                continue;
            }
            if let Err(e) = self
                .send(target, path, method.clone(), body.to_string(), json)
                .await
            {
                tracing::warn!("Broadcast {} {} to {} failed: {}", method, path, target, e);
            }
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
