use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE } };
use url::Url;

use super::AiTransport;
use crate::error::TransportError;
use crate::models::transport::{ AiChatRequest, AiChatResponse };

pub struct HttpTransport {
    http: HttpClient,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Result<Self, TransportError> {
        let endpoint = Url::parse(endpoint).map_err(|e|
            TransportError::Endpoint(format!("{}: {}", endpoint, e))
        )?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(TransportError::Endpoint(endpoint.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl AiTransport for HttpTransport {
    async fn chat(&self, request: &AiChatRequest) -> Result<AiChatResponse, TransportError> {
        debug!(
            "POST {} (history: {} messages)",
            self.endpoint,
            request.history.len()
        );
        let resp = self.http.post(self.endpoint.clone()).json(request).send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        // A well-formed reply envelope wins over the status code.
        match serde_json::from_str::<AiChatResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() =>
                Err(TransportError::Status {
                    status: status.as_u16(),
                    body,
                }),
            Err(e) => Err(TransportError::Decode(e.to_string())),
        }
    }
}
