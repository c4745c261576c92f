use std::fmt;
use std::time::Duration;

use log::info;
use serde::de::DeserializeOwned;
use serde_json::Value;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub enum ApiError {
    /// Server answered with a non-2xx status
    Status(u16, String),
    /// Connection or protocol failure before a status arrived
    Transport(String),
    /// Response body did not decode into the expected shape
    Decode(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::Status(code, body) => write!(f, "API returned status {code}: {body}"),
            ApiError::Transport(msg) => write!(f, "transport error: {msg}"),
            ApiError::Decode(msg) => write!(f, "undecodable response: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> ApiError {
        match err {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                ApiError::Status(code, body)
            }
            ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
        }
    }
}

/// Platform API client. One instance per run, connections are pooled by the agent.
pub struct Client {
    agent: ureq::Agent,
    base: String,
    token: String,
}

impl Client {
    pub fn new(base: &str, token: &str) -> Client {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .build();
        Client {
            agent,
            base: base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base, path);
        info!("GET {url}");
        let mut request = self
            .agent
            .get(&url)
            .set("Authorization", &self.auth_header());
        for (name, value) in query {
            request = request.query(name, value);
        }
        let response = request.call()?;
        response
            .into_json::<T>()
            .map_err(|err| ApiError::Decode(err.to_string()))
    }

    pub(crate) fn send_json<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: &Value,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base, path);
        info!("{method} {url}");
        let response = self
            .agent
            .request(method, &url)
            .set("Authorization", &self.auth_header())
            .send_json(body)?;
        response
            .into_json::<T>()
            .map_err(|err| ApiError::Decode(err.to_string()))
    }

    pub(crate) fn put_bytes(&self, path: &str, bytes: &[u8]) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base, path);
        info!("PUT {url} ({} bytes)", bytes.len());
        let response = self
            .agent
            .put(&url)
            .set("Authorization", &self.auth_header())
            .set("Content-Type", "application/octet-stream")
            .send_bytes(bytes)?;
        response
            .into_string()
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}
