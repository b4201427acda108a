//! PostgREST client.

mod query;

use reqwest::header::{HeaderValue, ACCEPT, CONTENT_RANGE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

pub use query::{parse_content_range, TableQuery};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const RETURN_REPRESENTATION: &str = "return=representation";
const COUNT_EXACT: &str = "count=exact";

/// Authenticated PostgREST client for one project.
#[derive(Clone)]
pub struct RestClient {
    rest_url: String,
    anon_key: String,
    access_token: Option<String>,
    client: Client,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RestClient")
            .field("rest_url", &self.rest_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            rest_url: config.rest_url()?,
            anon_key: config.anon_key()?,
            access_token: None,
            client: Client::builder().build()?,
        })
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    /// All rows matching `query`.
    pub async fn fetch<T: DeserializeOwned>(&self, query: &TableQuery) -> Result<Vec<T>> {
        let response = self.send(self.table_request(Method::GET, query)).await?;
        Ok(response.json().await?)
    }

    /// Exactly one row, or `None` when nothing matches.
    pub async fn fetch_one<T: DeserializeOwned>(&self, query: &TableQuery) -> Result<Option<T>> {
        let request = self
            .table_request(Method::GET, query)
            .header(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT));
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Ok(None);
        }
        let response = check_status(response).await?;
        Ok(Some(response.json().await?))
    }

    /// Exact number of rows matching `query`, without fetching them.
    pub async fn count_exact(&self, query: &TableQuery) -> Result<usize> {
        let request = self
            .table_request(Method::HEAD, query)
            .header("Prefer", COUNT_EXACT);
        let response = self.send(request).await?;
        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| Error::Backend("response carried no row count".to_string()))
    }

    /// Insert rows into `target`'s table; `target`'s select shapes the
    /// returned representation.
    pub async fn insert<B, T>(&self, target: &TableQuery, body: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .table_request(Method::POST, target)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Insert one row and return it as stored.
    pub async fn insert_one<B, T>(&self, target: &TableQuery, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.insert::<B, T>(target, body)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::Backend(format!("insert into {} returned no row", target.table()))
            })
    }

    pub async fn update<B, T>(&self, query: &TableQuery, body: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        require_filters(query)?;
        let request = self
            .table_request(Method::PATCH, query)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Delete matching rows and return them.
    pub async fn delete<T: DeserializeOwned>(&self, query: &TableQuery) -> Result<Vec<T>> {
        require_filters(query)?;
        let request = self
            .table_request(Method::DELETE, query)
            .header("Prefer", RETURN_REPRESENTATION);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Call a database function.
    pub async fn rpc<A, T>(&self, function: &str, args: &A) -> Result<T>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .authorized(
                self.client
                    .post(format!("{}/rpc/{function}", self.rest_url)),
            )
            .json(args);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn table_request(&self, method: Method, query: &TableQuery) -> RequestBuilder {
        self.authorized(
            self.client
                .request(method, self.table_url(query.table()))
                .query(&query.query_pairs()),
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request.header("apikey", &self.anon_key).bearer_auth(token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        check_status(request.send().await?).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        tracing::warn!("Backend rejected credentials: {}", parse_api_error(status, &body));
        return Err(Error::Unauthorized);
    }
    Err(Error::Backend(parse_api_error(status, &body)))
}

fn require_filters(query: &TableQuery) -> Result<()> {
    if query.has_filters() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "refusing unfiltered write to {}",
            query.table()
        )))
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    details: Option<String>,
}

/// Readable `message (status)` text from an auth or PostgREST error body.
pub(crate) fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorResponse>(body) {
        if let Some(message) = payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
        {
            let message = message.trim();
            return match payload.details.filter(|details| !details.trim().is_empty()) {
                Some(details) => format!("{message}: {} ({})", details.trim(), status.as_u16()),
                None => format!("{message} ({})", status.as_u16()),
            };
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_prefers_message_and_details() {
        let body = r#"{"code":"23505","message":"duplicate key value","details":"Key (post_id, user_id) already exists.","hint":null}"#;
        assert_eq!(
            parse_api_error(StatusCode::CONFLICT, body),
            "duplicate key value: Key (post_id, user_id) already exists. (409)"
        );
    }

    #[test]
    fn api_error_reads_auth_shapes() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, body),
            "Invalid login credentials (400)"
        );
    }

    #[test]
    fn api_error_falls_back_to_body_or_status() {
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, "  "), "HTTP 502");
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down (502)"
        );
    }

    #[test]
    fn unfiltered_writes_are_refused() {
        assert!(require_filters(&TableQuery::new("messages")).is_err());
        assert!(require_filters(&TableQuery::new("messages").eq("id", 1)).is_ok());
    }

    #[test]
    fn debug_redacts_access_token() {
        let client = RestClient::new(&ClientConfig::new("https://x.supabase.co", "anon"))
            .unwrap()
            .with_access_token("secret-jwt");
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret-jwt"));
        assert!(rendered.contains("https://x.supabase.co/rest/v1"));
    }
}
