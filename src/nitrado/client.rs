use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

use super::{ActionExecutor, ServerOutcome};
use crate::config::GameServer;
use crate::error::{BotError, Result};
use crate::models::{ActionRequest, CommandKind};

/// Body returned by the Nitrado API on every call
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Nitrado REST client
pub struct NitradoClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl NitradoClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Internal {
                message: format!("Failed to build Nitrado HTTP client: {}", e),
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> std::result::Result<(), String> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .form(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // Nitrado explains failures in the `message` field
        let message = response
            .json::<ApiResponse>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.to_string());
        Err(message)
    }

    async fn ban_player(&self, server: &GameServer, player: &str) -> std::result::Result<(), String> {
        self.post_form(
            &format!("/services/{}/gameservers/games/banlist", server.nitrado_id),
            &[("identifier", player)],
        )
        .await
    }

    async fn restart_server(
        &self,
        server: &GameServer,
        message: &str,
    ) -> std::result::Result<(), String> {
        self.post_form(
            &format!("/services/{}/gameservers/restart", server.nitrado_id),
            &[("message", message), ("restart_message", message)],
        )
        .await
    }
}

#[async_trait]
impl ActionExecutor for NitradoClient {
    async fn execute(&self, request: &ActionRequest) -> Result<Vec<ServerOutcome>> {
        let calls = request.servers.iter().map(|server| async move {
            let result = match request.command {
                CommandKind::Ban => self.ban_player(server, &request.payload).await,
                CommandKind::Restart => self.restart_server(server, &request.payload).await,
            };
            match &result {
                Ok(()) => info!("{} succeeded on {}", request.command, server.name),
                Err(e) => error!("{} failed on {}: {}", request.command, server.name, e),
            }
            ServerOutcome {
                server_name: server.name.clone(),
                error: result.err(),
            }
        });

        let outcomes = join_all(calls).await;
        summarize(request.command, outcomes)
    }
}

/// Turn per-server outcomes into the executor result
fn summarize(command: CommandKind, outcomes: Vec<ServerOutcome>) -> Result<Vec<ServerOutcome>> {
    if !outcomes.is_empty() && outcomes.iter().all(|o| o.error.is_some()) {
        let message = outcomes
            .iter()
            .filter_map(|o| o.error.as_ref().map(|e| format!("{}: {}", o.server_name, e)))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(BotError::ExecutionFailed {
            action: command.name().to_string(),
            message,
        });
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{game_server, silent_server};

    fn outcome(name: &str, error: Option<&str>) -> ServerOutcome {
        ServerOutcome {
            server_name: name.to_string(),
            error: error.map(String::from),
        }
    }

    #[test]
    fn test_partial_failure_is_reported_per_server() {
        let outcomes = vec![outcome("Island", None), outcome("Center", Some("offline"))];
        let result = summarize(CommandKind::Restart, outcomes).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_total_failure_is_execution_failed() {
        let outcomes = vec![
            outcome("Island", Some("offline")),
            outcome("Center", Some("denied")),
        ];
        let err = summarize(CommandKind::Ban, outcomes).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to ban: Island: offline; Center: denied"
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client =
            NitradoClient::new("https://api.nitrado.net/", "token", Duration::from_secs(30)).unwrap();
        assert_eq!(client.base_url, "https://api.nitrado.net");
    }

    #[tokio::test]
    async fn test_unresponsive_api_times_out() {
        let base_url = silent_server().await;
        let client = NitradoClient::new(&base_url, "token", Duration::from_millis(200)).unwrap();
        let request = ActionRequest {
            command: CommandKind::Restart,
            servers: vec![game_server(1, 12345, "Island")],
            payload: "maintenance".to_string(),
        };

        let result = tokio::time::timeout(Duration::from_secs(5), client.execute(&request))
            .await
            .expect("request should give up on its own");
        assert!(matches!(result, Err(BotError::ExecutionFailed { .. })));
    }
}
