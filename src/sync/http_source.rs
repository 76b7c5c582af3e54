//! HttpPinSource - `PinSource` backed by the REST API.

use std::future::Future;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::source::PinSource;
use crate::error::PinError;
use crate::model::{NewPin, Pin, ViewportRect};

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Talks to `/toilets/nearby` and `POST /toilets` under `base_url`
/// (e.g. `http://localhost:3001/api`).
#[derive(Clone)]
pub struct HttpPinSource {
    client: Client,
    base_url: String,
}

impl HttpPinSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn transport(err: reqwest::Error) -> PinError {
    PinError::Transport(err.to_string())
}

/// Map a non-success response onto the error taxonomy.
async fn error_from(response: Response, invalid: fn(String) -> PinError) -> PinError {
    let status = response.status();
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status.to_string(),
    };
    match status {
        StatusCode::BAD_REQUEST => invalid(message),
        StatusCode::NOT_FOUND => PinError::NotFound(message),
        s if s.is_server_error() => PinError::Storage(message),
        _ => PinError::Transport(format!("unexpected status {}: {}", status, message)),
    }
}

/// The API answers an empty viewport with 404 and a `{message}` body.
/// Any other 404 is a route miss, usually a base URL without `/api`.
async fn empty_viewport(response: Response) -> Result<Vec<Pin>, PinError> {
    let url = response.url().to_string();
    match response.json::<ErrorBody>().await {
        Ok(_) => Ok(Vec::new()),
        Err(_) => Err(PinError::Transport(format!("no pin API at {}", url))),
    }
}

impl PinSource for HttpPinSource {
    fn fetch_viewport(
        &self,
        rect: ViewportRect,
    ) -> impl Future<Output = Result<Vec<Pin>, PinError>> + Send {
        let request = self
            .client
            .get(format!("{}/toilets/nearby", self.base_url))
            .query(&[
                ("swLong", rect.sw_lon),
                ("swLat", rect.sw_lat),
                ("neLong", rect.ne_lon),
                ("neLat", rect.ne_lat),
            ]);
        async move {
            let response = request.send().await.map_err(transport)?;
            match response.status() {
                s if s.is_success() => response.json::<Vec<Pin>>().await.map_err(transport),
                StatusCode::NOT_FOUND => empty_viewport(response).await,
                _ => Err(error_from(response, PinError::InvalidQuery).await),
            }
        }
    }

    fn submit_pin(&self, draft: NewPin) -> impl Future<Output = Result<Pin, PinError>> + Send {
        let request = self
            .client
            .post(format!("{}/toilets", self.base_url))
            .json(&draft);
        async move {
            let response = request.send().await.map_err(transport)?;
            if response.status().is_success() {
                response.json::<Pin>().await.map_err(transport)
            } else {
                Err(error_from(response, PinError::InvalidPin).await)
            }
        }
    }
}
