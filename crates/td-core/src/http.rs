//! HTTP implementation of [`Remote`].
//!
//! Speaks JSON to a topics endpoint:
//!
//! | call                | request                                   |
//! |---------------------|-------------------------------------------|
//! | `list_topics`       | `GET /topics`                             |
//! | `create_topic`      | `POST /topics` `{"name": ..}`             |
//! | `update_topic_body` | `PUT /topics/{id}` `{"contents": ..}`     |
//! | `update_topic_name` | `PUT /topics/{id}` `{"name": ..}`         |
//! | `delete_topic`      | `DELETE /topics/{id}`                     |

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::config::Settings;
use crate::error::{TdError, TdResult};
use crate::remote::{Remote, RemoteError, RemoteResult};
use crate::topic::Topic;

/// Remote topic store reached over HTTP.
pub struct HttpRemote {
    client: Client,
    base: String,
    token: Option<String>,
}

impl HttpRemote {
    pub fn new(base: &str, token: Option<String>, timeout: Duration) -> TdResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TdError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Build from settings. Fails if no server is configured.
    pub fn from_settings(settings: &Settings) -> TdResult<Self> {
        let server = settings.server.as_deref().ok_or_else(|| {
            TdError::Config("no server configured (set TD_SERVER or \"server\" in config.json)".into())
        })?;
        Self::new(
            server,
            settings.token.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base);
        debug!(%method, %url, "remote request");
        let req = self.client.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn send(&self, req: RequestBuilder) -> RemoteResult<Response> {
        let res = req
            .send()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let message = res.text().unwrap_or_default().trim().to_string();
        Err(RemoteError::Status {
            code: status.as_u16(),
            message,
        })
    }

    fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> RemoteResult<T> {
        self.send(req)?
            .json()
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

impl Remote for HttpRemote {
    fn list_topics(&self) -> RemoteResult<Vec<Topic>> {
        let topics: Option<Vec<Topic>> = self.send_json(self.request(Method::GET, "/topics"))?;
        Ok(topics.unwrap_or_default())
    }

    fn create_topic(&self, name: &str) -> RemoteResult<Topic> {
        let req = self
            .request(Method::POST, "/topics")
            .json(&json!({ "name": name }));
        self.send_json(req)
    }

    fn update_topic_body(&self, id: &str, body: &str) -> RemoteResult<()> {
        let req = self
            .request(Method::PUT, &format!("/topics/{id}"))
            .json(&json!({ "contents": body }));
        self.send(req).map(drop)
    }

    fn update_topic_name(&self, id: &str, name: &str) -> RemoteResult<()> {
        let req = self
            .request(Method::PUT, &format!("/topics/{id}"))
            .json(&json!({ "name": name }));
        self.send(req).map(drop)
    }

    fn delete_topic(&self, id: &str) -> RemoteResult<()> {
        self.send(self.request(Method::DELETE, &format!("/topics/{id}")))
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_server() {
        let settings = Settings::default();
        assert!(matches!(
            HttpRemote::from_settings(&settings),
            Err(TdError::Config(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let remote = HttpRemote::new("http://localhost:3000/api/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(remote.base, "http://localhost:3000/api");
    }

    #[test]
    fn test_unreachable_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server.
        let remote = HttpRemote::new("http://127.0.0.1:9", None, Duration::from_millis(500)).unwrap();
        assert!(matches!(
            remote.delete_topic("1"),
            Err(RemoteError::Transport(_))
        ));
    }
}
