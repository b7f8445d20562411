//! Integration test support for stockcart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p stockcart-integration-tests
//! ```
//!
//! # Test Doubles
//!
//! - [`FakeOracle`] - in-memory stock and catalog with failure, delay and
//!   hang switches, plus call counters
//! - [`FlakyMirror`] - [`MemoryMirror`] whose saves can be made to fail or
//!   to linger after writing
//! - [`RecordingSink`] - keeps every reported failure for assertions
//!
//! Tests share doubles with the store through `Arc`, which implements every
//! collaborator trait.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;
use stockcart::{
    CartStore, FailureKind, MemoryMirror, MirrorError, NotificationSink, OracleError,
    PersistentMirror, StockOracle, StoreOptions,
};
use stockcart_core::{Cart, LineItem, Product, ProductId, StockSnapshot};

/// Catalog entry used throughout the tests.
#[must_use]
pub fn product(id: u32) -> Product {
    Product::new(
        ProductId::new(id),
        format!("Sneaker {id}"),
        Decimal::new(i64::from(id) * 1_000 + 990, 2),
        format!("https://cdn.example.com/sneakers/{id}.jpg"),
    )
}

/// Line item for [`product`] with the given amount.
#[must_use]
pub fn line(id: u32, amount: u32) -> LineItem {
    LineItem::new(product(id), amount)
}

/// `(id, amount)` pairs of a cart, in order.
#[must_use]
pub fn summary(cart: &Cart) -> Vec<(u32, u32)> {
    cart.items()
        .iter()
        .map(|item| (item.id().as_u32(), item.amount))
        .collect()
}

// =============================================================================
// Oracle
// =============================================================================

/// In-memory stock oracle.
#[derive(Default)]
pub struct FakeOracle {
    stock: Mutex<HashMap<ProductId, u32>>,
    fail: AtomicBool,
    hang: AtomicBool,
    delay: Mutex<Option<Duration>>,
    stock_calls: AtomicUsize,
    product_calls: AtomicUsize,
}

impl FakeOracle {
    /// Oracle with the given `(id, stock)` entries. Every product id is in
    /// the catalog.
    #[must_use]
    pub fn with_stock(entries: &[(u32, u32)]) -> Self {
        let oracle = Self::default();
        for &(id, amount) in entries {
            oracle.set_stock(id, amount);
        }
        oracle
    }

    pub fn set_stock(&self, id: u32, amount: u32) {
        self.stock.lock().unwrap().insert(ProductId::new(id), amount);
    }

    /// Make every lookup fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make every lookup never complete.
    pub fn set_hanging(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    /// Delay every lookup.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    #[must_use]
    pub fn stock_calls(&self) -> usize {
        self.stock_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn product_calls(&self) -> usize {
        self.product_calls.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<(), OracleError> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(OracleError::Unavailable("product API down".to_string()));
        }
        Ok(())
    }
}

impl StockOracle for FakeOracle {
    async fn get_stock(&self, id: ProductId) -> Result<StockSnapshot, OracleError> {
        self.stock_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;

        let amount = self.stock.lock().unwrap().get(&id).copied();
        amount
            .map(|amount| StockSnapshot::new(id, amount))
            .ok_or_else(|| OracleError::NotFound(format!("stock/{id}")))
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, OracleError> {
        self.product_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;

        Ok(product(id.as_u32()))
    }
}

// =============================================================================
// Mirror
// =============================================================================

/// Memory mirror with a switch that makes saves fail.
#[derive(Default)]
pub struct FlakyMirror {
    inner: MemoryMirror,
    fail_saves: AtomicBool,
    save_delay: Mutex<Option<Duration>>,
    saves: AtomicUsize,
}

impl FlakyMirror {
    /// Mirror holding `cart` under the default key.
    #[must_use]
    pub fn with_cart(cart: &Cart) -> Self {
        Self {
            inner: MemoryMirror::seeded(StoreOptions::default().storage_key, cart.to_json().unwrap()),
            ..Self::default()
        }
    }

    /// Mirror holding a raw value under the default key.
    #[must_use]
    pub fn with_raw(value: &str) -> Self {
        Self {
            inner: MemoryMirror::seeded(StoreOptions::default().storage_key, value),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Wait this long after each write before reporting success.
    pub fn set_save_delay(&self, delay: Duration) {
        *self.save_delay.lock().unwrap() = Some(delay);
    }

    /// Successful saves so far.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Cart currently stored under the default key.
    pub async fn stored_cart(&self) -> Option<Cart> {
        self.inner
            .get(&StoreOptions::default().storage_key)
            .await
            .map(|json| Cart::from_json(&json).unwrap())
    }
}

impl PersistentMirror for FlakyMirror {
    async fn load(&self, key: &str) -> Result<Option<String>, MirrorError> {
        self.inner.load(key).await
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), MirrorError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(MirrorError::Unavailable("quota exceeded".to_string()));
        }
        self.inner.save(key, value).await?;
        self.saves.fetch_add(1, Ordering::SeqCst);

        let delay = *self.save_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

// =============================================================================
// Sink
// =============================================================================

/// Sink that records every report.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(FailureKind, String)>>,
}

impl RecordingSink {
    #[must_use]
    pub fn reports(&self) -> Vec<(FailureKind, String)> {
        self.reports.lock().unwrap().clone()
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<FailureKind> {
        self.reports().into_iter().map(|(kind, _)| kind).collect()
    }
}

impl NotificationSink for RecordingSink {
    fn report_failure(&self, kind: FailureKind, message: &str) {
        self.reports.lock().unwrap().push((kind, message.to_string()));
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Store under test.
pub type TestStore = CartStore<Arc<FakeOracle>, Arc<FlakyMirror>, Arc<RecordingSink>>;

/// A store plus handles on its collaborators.
pub struct Harness {
    pub store: TestStore,
    pub oracle: Arc<FakeOracle>,
    pub mirror: Arc<FlakyMirror>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    /// Open a store over `oracle` and `mirror` with default options.
    pub async fn open(oracle: FakeOracle, mirror: FlakyMirror) -> Self {
        Self::open_with(oracle, mirror, StoreOptions::default()).await
    }

    /// Open a store with explicit options.
    pub async fn open_with(oracle: FakeOracle, mirror: FlakyMirror, options: StoreOptions) -> Self {
        let oracle = Arc::new(oracle);
        let mirror = Arc::new(mirror);
        let sink = Arc::new(RecordingSink::default());

        let store = CartStore::open(
            Arc::clone(&oracle),
            Arc::clone(&mirror),
            Arc::clone(&sink),
            options,
        )
        .await;

        Self {
            store,
            oracle,
            mirror,
            sink,
        }
    }

    /// Open a store whose mirror already holds `items`.
    pub async fn with_cart(oracle: FakeOracle, items: &[(u32, u32)]) -> Self {
        let cart = Cart::from_items(items.iter().map(|&(id, amount)| line(id, amount)));
        Self::open(oracle, FlakyMirror::with_cart(&cart)).await
    }
}
