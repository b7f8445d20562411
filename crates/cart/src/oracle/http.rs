//! JSON-over-HTTP stock oracle.
//!
//! Talks to a product API exposing:
//! - `GET {base}/stock/{id}` → `{"id": 1, "amount": 3}`
//! - `GET {base}/products/{id}` → `{"id": 1, "title": "...", "price": 179.9, "image": "..."}`

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use stockcart_core::{Product, ProductId, StockSnapshot};
use tracing::{debug, instrument};

use super::{OracleError, StockOracle};
use crate::config::StockApiConfig;

const PRODUCT_CACHE_CAPACITY: u64 = 1000;
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(300);
const LOGGED_BODY_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct StockResponse {
    amount: u32,
}

/// Client for the product API.
///
/// Catalog lookups are cached for 5 minutes. Stock lookups always hit the
/// API. Cheap to clone.
#[derive(Clone)]
pub struct HttpStockOracle {
    inner: Arc<HttpStockOracleInner>,
}

struct HttpStockOracleInner {
    client: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
    products: Cache<ProductId, Product>,
}

impl HttpStockOracle {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::Http` if the HTTP client cannot be built.
    pub fn new(config: &StockApiConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        let products = Cache::builder()
            .max_capacity(PRODUCT_CACHE_CAPACITY)
            .time_to_live(PRODUCT_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(HttpStockOracleInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                token: config.token.clone(),
                products,
            }),
        })
    }

    /// GET `{base}/{resource}/{id}` and decode the JSON body.
    async fn fetch<T: DeserializeOwned>(
        &self,
        resource: &str,
        id: ProductId,
    ) -> Result<T, OracleError> {
        let url = format!("{}/{resource}/{id}", self.inner.base_url);

        let mut request = self
            .inner
            .client
            .get(&url)
            .header("Accept", "application/json");
        if let Some(token) = &self.inner.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(OracleError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(OracleError::NotFound(format!("{resource}/{id}")));
        }

        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                "Product API returned non-success status"
            );
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                "Failed to parse product API response"
            );
            OracleError::Parse(e)
        })
    }
}

impl StockOracle for HttpStockOracle {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_stock(&self, id: ProductId) -> Result<StockSnapshot, OracleError> {
        let stock: StockResponse = self.fetch("stock", id).await?;
        debug!(amount = stock.amount, "Fetched stock");
        Ok(StockSnapshot::new(id, stock.amount))
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<Product, OracleError> {
        if let Some(product) = self.inner.products.get(&id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let product: Product = self.fetch("products", id).await?;

        self.inner.products.insert(id, product.clone()).await;

        Ok(product)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use url::Url;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn oracle_for(server: &MockServer, token: Option<&str>) -> HttpStockOracle {
        let config = StockApiConfig {
            base_url: Url::parse(&format!("{}/", server.uri())).unwrap(),
            token: token.map(SecretString::from),
            timeout: Duration::from_secs(5),
        };
        HttpStockOracle::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_get_stock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stock/3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 3, "amount": 7})),
            )
            .mount(&server)
            .await;

        let stock = oracle_for(&server, None)
            .get_stock(ProductId::new(3))
            .await
            .unwrap();
        assert_eq!(stock, StockSnapshot::new(ProductId::new(3), 7));
    }

    #[tokio::test]
    async fn test_get_stock_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stock/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"amount": 2})))
            .expect(2)
            .mount(&server)
            .await;

        let oracle = oracle_for(&server, None);
        oracle.get_stock(ProductId::new(1)).await.unwrap();
        oracle.get_stock(ProductId::new(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_product_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 2,
                "title": "Trail runner",
                "price": 139.9,
                "image": "https://cdn.example.com/2.jpg"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let oracle = oracle_for(&server, None);
        let first = oracle.get_product(ProductId::new(2)).await.unwrap();
        let second = oracle.get_product(ProductId::new(2)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.title, "Trail runner");
        assert_eq!(first.price, Decimal::new(1399, 1));
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stock/1"))
            .and(header("Authorization", "Bearer k3y-Zq9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"amount": 1})))
            .mount(&server)
            .await;

        let stock = oracle_for(&server, Some("k3y-Zq9"))
            .get_stock(ProductId::new(1))
            .await
            .unwrap();
        assert_eq!(stock.amount, 1);
    }

    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/99"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = oracle_for(&server, None)
            .get_product(ProductId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::NotFound(ref what) if what == "products/99"));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stock/1"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
            .mount(&server)
            .await;

        let err = oracle_for(&server, None)
            .get_stock(ProductId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::RateLimited(12)));
    }

    #[tokio::test]
    async fn test_server_error_and_bad_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stock/1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/stock/2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server, None);

        let err = oracle.get_stock(ProductId::new(1)).await.unwrap_err();
        assert!(matches!(err, OracleError::Status { status: 500, ref body } if body == "boom"));

        let err = oracle.get_stock(ProductId::new(2)).await.unwrap_err();
        assert!(matches!(err, OracleError::Parse(_)));
    }
}
