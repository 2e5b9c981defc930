use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Settings;

/// Remote failures are never fatal. Callers log them and continue with
/// local data; the local file stays the source of truth.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote responded with {status}: {message}")]
    Status { status: u16, message: String },
}

/// Client for the sync server. Exists only when `server`, `server_port` and
/// `password` are all configured; otherwise the tool runs local-only.
pub struct RemoteClient {
    base_url: String,
    password: String,
    http: reqwest::Client,
}

impl RemoteClient {
    pub fn from_settings(settings: &Settings) -> Option<RemoteClient> {
        let (Some(server), Some(port), Some(password)) = (
            settings.server.as_ref(),
            settings.server_port,
            settings.password.as_ref(),
        ) else {
            debug!("remote sync not configured, running local-only");
            return None;
        };
        Some(RemoteClient {
            base_url: format!("http://{server}:{port}"),
            password: password.clone(),
            http: reqwest::Client::new(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(base_url: String, password: String) -> RemoteClient {
        RemoteClient {
            base_url,
            password,
            http: reqwest::Client::new(),
        }
    }

    /// Fetches the remote copy of the activities table. Returns None when
    /// the remote holds no data yet.
    pub async fn retrieve(&self) -> Result<Option<String>, RemoteError> {
        let response = self
            .http
            .post(format!("{}/retrieve", self.base_url))
            .json(&json!({ "password": self.password }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        info!("retrieved activities from remote");
        if body.is_empty() {
            Ok(None)
        } else {
            Ok(Some(body))
        }
    }

    /// Pushes the full local table, overwriting the remote copy. Last write
    /// wins; there is no merge.
    pub async fn push(&self, data: &str) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(format!("{}/sync", self.base_url))
            .json(&json!({ "password": self.password, "data": data }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        info!("pushed activities to remote");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{body_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use crate::config::Settings;

    use super::{RemoteClient, RemoteError};

    fn client_for(server: &MockServer) -> RemoteClient {
        RemoteClient::with_base_url(server.uri(), "hunter2".into())
    }

    #[test]
    fn client_requires_full_remote_config() {
        let mut settings = Settings {
            server: Some("host".into()),
            server_port: Some(8080),
            password: None,
        };
        assert!(RemoteClient::from_settings(&settings).is_none());

        settings.password = Some("hunter2".into());
        assert!(RemoteClient::from_settings(&settings).is_some());

        settings.server = None;
        assert!(RemoteClient::from_settings(&settings).is_none());
    }

    #[tokio::test]
    async fn retrieve_returns_the_table_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/retrieve"))
            .and(body_json(serde_json::json!({ "password": "hunter2" })))
            .respond_with(ResponseTemplate::new(200).set_body_string("Activity,start_time\n"))
            .expect(1)
            .mount(&server)
            .await;

        let body = client_for(&server).retrieve().await.unwrap();
        assert_eq!(body.as_deref(), Some("Activity,start_time\n"));
    }

    #[tokio::test]
    async fn retrieve_treats_empty_body_as_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/retrieve"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(client_for(&server).retrieve().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_200_is_an_error_with_the_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/retrieve"))
            .respond_with(ResponseTemplate::new(403).set_body_string("bad password"))
            .mount(&server)
            .await;

        match client_for(&server).retrieve().await {
            Err(RemoteError::Status { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "bad password");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn push_sends_password_and_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sync"))
            .and(body_json(serde_json::json!({
                "password": "hunter2",
                "data": "Activity,start_time,stop_time,Duration\n",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .push("Activity,start_time,stop_time,Duration\n")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn push_surfaces_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sync"))
            .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
            .mount(&server)
            .await;

        let result = client_for(&server).push("data").await;
        assert!(matches!(
            result,
            Err(RemoteError::Status { status: 500, .. })
        ));
    }
}
