//! HTTP client library for making JSON API requests.
//!
//! A thin wrapper around reqwest that serializes request bodies, checks the
//! response status and deserializes the response body.
//!
//! # Examples
//!
//! ```rust,no_run
//! use rr_requests::ApiClient;
//!
//! # async fn example() -> Result<(), rr_requests::Error> {
//! let client = ApiClient::new("http://127.0.0.1:3000/v1")?;
//! let reports: serde_json::Value = client.get("reports").await?;
//! # Ok(())
//! # }
//! ```

use reqwest::{Method, RequestBuilder, StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};
use tracing::trace;

/// Request errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Transport level failure.
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// The response body wasn't the expected JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("{method} {url} failed with status {status}: {body}")]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
        body: String,
    },
}

impl Error {
    /// Whether the server reported that the resource doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

/// Request result type.
pub type Result<T> = core::result::Result<T, Error>;

/// HTTP client for making API requests with JSON support.
#[derive(Debug, Clone)]
pub struct ApiClient {
    url: String,
    pub client: reqwest::Client,
}

impl ApiClient {
    /// Creates a new API client with the given base URL.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rr_requests::ApiClient;
    ///
    /// let client = ApiClient::new("https://api.example.com/v1").unwrap();
    /// assert_eq!(client.path("runs"), "https://api.example.com/v1/runs");
    /// ```
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "content-type",
            header::HeaderValue::from_static("application/json"),
        );
        let client = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .cookie_store(true)
            .build()?;
        let url: String = url.into();
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Constructs the full URL path for an endpoint.
    pub fn path(&self, endpoint: &str) -> String {
        format!("{}/{}", self.url, endpoint.trim_start_matches('/'))
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.client.request(method, self.path(endpoint))
    }

    /// Sends the request and deserializes a successful response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send_raw(request).await?;
        let text = response.text().await?;
        trace!("Response {text}");
        Ok(serde_json::from_str(&text)?)
    }

    async fn send_raw(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let request = request.build()?;
        let method = request.method().clone();
        let url = request.url().to_string();
        let response = self.client.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                method,
                url,
                status,
                body,
            });
        }
        Ok(response)
    }

    /// Makes a GET request to the specified endpoint.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.send(self.request(Method::GET, endpoint)).await
    }

    /// Makes a GET request with query parameters.
    pub async fn get_with_params<T, Q>(&self, endpoint: &str, params: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.request(Method::GET, endpoint).query(params))
            .await
    }

    /// Makes a POST request with a JSON body and deserializes the response.
    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_string(body)?;
        self.send(self.request(Method::POST, endpoint).body(payload))
            .await
    }

    /// Makes a POST request with query parameters and no body.
    pub async fn post_no_body<T, Q>(&self, endpoint: &str, params: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.request(Method::POST, endpoint).query(params))
            .await
    }

    /// Makes a PUT request with a JSON body, ignoring the response body.
    pub async fn put<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<()> {
        let payload = serde_json::to_string(body)?;
        self.send_raw(self.request(Method::PUT, endpoint).body(payload))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Json, Router,
        extract::{Path, Query},
        http::StatusCode,
        routing::{get, put},
    };
    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;

    #[derive(Deserialize)]
    struct Filter {
        project_id: Option<String>,
    }

    async fn serve() -> String {
        let app = Router::new()
            .route(
                "/v1/items/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "missing" {
                        Err(StatusCode::NOT_FOUND)
                    } else {
                        Ok(Json(json!({ "id": id })))
                    }
                }),
            )
            .route(
                "/v1/items",
                get(|Query(filter): Query<Filter>| async move {
                    Json(json!({ "project_id": filter.project_id }))
                })
                .post(|Json(body): Json<Value>| async move { Json(body) }),
            )
            .route("/v1/items/{id}/flag", put(|| async { StatusCode::NO_CONTENT }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}/v1/")
    }

    #[tokio::test]
    async fn get_post_and_put() -> Result<()> {
        let client = ApiClient::new(serve().await)?;

        let item: Value = client.get("items/abc").await?;
        assert_eq!(item["id"], "abc");

        let filtered: Value = client
            .get_with_params("items", &[("project_id", "p1")])
            .await?;
        assert_eq!(filtered["project_id"], "p1");

        let echoed: Value = client.post("items", &json!({ "name": "x" })).await?;
        assert_eq!(echoed["name"], "x");

        client.put("items/abc/flag", &json!({ "on": true })).await?;
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_reported() -> Result<()> {
        let client = ApiClient::new(serve().await)?;
        let err = client
            .get::<Value>("items/missing")
            .await
            .expect_err("missing item");
        assert!(err.is_not_found(), "{err}");
        Ok(())
    }
}
