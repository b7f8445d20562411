//! The cart store.
//!
//! [`CartStore`] is the sole owner of cart state. Every mutation follows the
//! same path:
//!
//! 1. Build a candidate cart from the current one (copy-on-write)
//! 2. Check it against a fresh stock snapshot when quantities grow
//! 3. Persist the full candidate to the mirror
//! 4. Publish it to subscribers
//!
//! A failure at any step reports to the notification sink, returns the
//! error and leaves the published cart untouched.
//!
//! # Concurrency
//!
//! Mutations are serialized by an async mutex held across the whole
//! read-fetch-persist-publish sequence, so two concurrent adds of the same
//! product both land. Reads go through a `watch` channel and never wait on
//! a mutation. The persist-and-publish step runs on its own task, so a
//! caller that drops its future cannot leave the mirror ahead of
//! subscribers.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = CartStore::open(oracle, FileMirror::new(".stockcart"), TracingSink, StoreOptions::default()).await;
//!
//! store.add_product(ProductId::new(1)).await?;
//! store.update_product_amount(ProductId::new(1), 3).await?;
//! println!("{} items", store.cart().total_quantity());
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use stockcart_core::{Cart, LineItem, ProductId, StockSnapshot};
use tokio::sync::{Mutex, OwnedMutexGuard, watch};
use tracing::{Instrument, Span, debug, info, instrument, warn};

use crate::config::{CartConfig, DEFAULT_STORAGE_KEY};
use crate::error::{CartError, Operation};
use crate::mirror::{MirrorError, PersistentMirror};
use crate::notify::NotificationSink;
use crate::oracle::{OracleError, StockOracle};

const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Mirror key the cart is stored under.
    pub storage_key: String,
    /// Upper bound on each stock or catalog lookup.
    pub oracle_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }
}

impl From<&CartConfig> for StoreOptions {
    fn from(config: &CartConfig) -> Self {
        Self {
            storage_key: config.storage_key.clone(),
            oracle_timeout: config.stock_api.timeout,
        }
    }
}

/// Owner of one session's cart.
///
/// Construct once per session with [`CartStore::open`] and share by
/// reference or `Arc`.
///
/// # Cancel safety
///
/// Every mutating method is cancel safe. Dropping its future before the
/// commit starts changes nothing. Once the commit has started, it runs to
/// completion on its own task, so the mirror and the published cart always
/// agree and failures still reach the sink.
pub struct CartStore<O, M, N> {
    oracle: O,
    oracle_timeout: Duration,
    shared: Arc<Shared<M, N>>,
    write_lock: Arc<Mutex<()>>,
}

/// State a commit needs once it is detached from the caller.
struct Shared<M, N> {
    mirror: M,
    sink: N,
    storage_key: String,
    cart: watch::Sender<Cart>,
}

impl<O, M, N> CartStore<O, M, N>
where
    O: StockOracle,
    M: PersistentMirror + 'static,
    N: NotificationSink + 'static,
{
    /// Open the store, adopting the cart stored in `mirror` if there is one.
    ///
    /// Never fails: a missing value, an unreadable mirror or an undecodable
    /// value all start the session with an empty cart.
    pub async fn open(oracle: O, mirror: M, sink: N, options: StoreOptions) -> Self {
        let initial = load_initial(&mirror, &options.storage_key).await;
        info!(
            storage_key = %options.storage_key,
            items = initial.len(),
            "Cart store opened"
        );

        Self {
            oracle,
            oracle_timeout: options.oracle_timeout,
            shared: Arc::new(Shared {
                mirror,
                sink,
                storage_key: options.storage_key,
                cart: watch::Sender::new(initial),
            }),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.shared.cart.borrow().clone()
    }

    /// Receiver notified after every accepted mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.shared.cart.subscribe()
    }

    /// Add one unit of a product.
    ///
    /// A product already in the cart has its amount incremented; a new one
    /// is fetched from the catalog and appended with amount 1.
    ///
    /// Cancel safe, see [`CartStore`].
    ///
    /// # Errors
    ///
    /// - `CartError::StockExceeded` if the new amount exceeds stock
    /// - `CartError::Oracle` if a lookup fails or times out
    /// - `CartError::Persistence` if the cart cannot be saved
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_product(&self, product_id: ProductId) -> Result<Cart, CartError> {
        let guard = Arc::clone(&self.write_lock).lock_owned().await;
        let candidate = self.plan_add(product_id).await;
        self.commit(guard, Operation::Add, candidate).await
    }

    /// Remove a product from the cart entirely.
    ///
    /// Cancel safe, see [`CartStore`].
    ///
    /// # Errors
    ///
    /// - `CartError::NotFound` if the product is not in the cart
    /// - `CartError::Persistence` if the cart cannot be saved
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_product(&self, product_id: ProductId) -> Result<Cart, CartError> {
        let guard = Arc::clone(&self.write_lock).lock_owned().await;
        let candidate = self.plan_remove(product_id);
        self.commit(guard, Operation::Remove, candidate).await
    }

    /// Set the amount of a product already in the cart.
    ///
    /// Cancel safe, see [`CartStore`].
    ///
    /// # Errors
    ///
    /// - `CartError::InvalidAmount` if `amount` is 0
    /// - `CartError::NotFound` if the product is not in the cart
    /// - `CartError::StockExceeded` if `amount` exceeds stock
    /// - `CartError::Oracle` if the stock lookup fails or times out
    /// - `CartError::Persistence` if the cart cannot be saved
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_product_amount(
        &self,
        product_id: ProductId,
        amount: u32,
    ) -> Result<Cart, CartError> {
        let guard = Arc::clone(&self.write_lock).lock_owned().await;
        let candidate = self.plan_update(product_id, amount).await;
        self.commit(guard, Operation::Update, candidate).await
    }

    /// Empty the cart.
    ///
    /// Cancel safe, see [`CartStore`].
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence` if the empty cart cannot be saved.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Cart, CartError> {
        let guard = Arc::clone(&self.write_lock).lock_owned().await;
        self.commit(guard, Operation::Clear, Ok(Cart::new())).await
    }

    async fn plan_add(&self, product_id: ProductId) -> Result<Cart, CartError> {
        let current = self.cart();
        let requested = current.amount_of(product_id).saturating_add(1);

        let stock = self.lookup(self.oracle.get_stock(product_id)).await?;
        if !stock.allows(requested) {
            return Err(stock_exceeded(&stock, requested));
        }

        if current.contains(product_id) {
            return Ok(current.with_amount(product_id, requested));
        }

        let mut product = self.lookup(self.oracle.get_product(product_id)).await?;
        if product.id != product_id {
            debug!(catalog_id = %product.id, "Catalog returned a different id, keeping the requested one");
            product.id = product_id;
        }
        Ok(current.with_item(LineItem::new(product, 1)))
    }

    fn plan_remove(&self, product_id: ProductId) -> Result<Cart, CartError> {
        let current = self.cart();
        if !current.contains(product_id) {
            return Err(CartError::NotFound(product_id));
        }

        Ok(current.without(product_id))
    }

    async fn plan_update(&self, product_id: ProductId, amount: u32) -> Result<Cart, CartError> {
        if amount < 1 {
            return Err(CartError::InvalidAmount(amount));
        }

        let current = self.cart();
        if !current.contains(product_id) {
            return Err(CartError::NotFound(product_id));
        }

        let stock = self.lookup(self.oracle.get_stock(product_id)).await?;
        if !stock.allows(amount) {
            return Err(stock_exceeded(&stock, amount));
        }

        Ok(current.with_amount(product_id, amount))
    }

    /// Persist and publish an accepted candidate, or report a rejected one.
    ///
    /// The save and the publish run on a spawned task that holds the write
    /// lock until both are done, so dropping the caller cannot separate them.
    async fn commit(
        &self,
        guard: OwnedMutexGuard<()>,
        operation: Operation,
        candidate: Result<Cart, CartError>,
    ) -> Result<Cart, CartError> {
        let candidate = match candidate {
            Ok(candidate) => candidate,
            Err(err) => return Err(self.shared.settle(operation, err)),
        };

        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(
            async move {
                let _guard = guard;
                shared
                    .persist(candidate)
                    .await
                    .map_err(|err| shared.settle(operation, err))
            }
            .instrument(Span::current()),
        );

        match task.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(CartError::Persistence(MirrorError::Unavailable(
                "commit task cancelled".to_string(),
            ))),
        }
    }

    /// Await an oracle call, bounded by the configured timeout.
    async fn lookup<T>(
        &self,
        call: impl Future<Output = Result<T, OracleError>>,
    ) -> Result<T, OracleError> {
        let timeout = self.oracle_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| OracleError::Timeout(timeout))?
    }
}

impl<M, N> Shared<M, N>
where
    M: PersistentMirror,
    N: NotificationSink,
{
    /// Persist `candidate`, then publish it. Nothing is published if the
    /// save fails.
    async fn persist(&self, candidate: Cart) -> Result<Cart, CartError> {
        let json = candidate.to_json().map_err(MirrorError::from)?;
        self.mirror.save(&self.storage_key, &json).await?;

        self.cart.send_replace(candidate.clone());
        debug!(
            items = candidate.len(),
            quantity = candidate.total_quantity(),
            "Cart committed"
        );
        Ok(candidate)
    }

    /// Report a failure to the sink and hand the error back.
    fn settle(&self, operation: Operation, err: CartError) -> CartError {
        if err.is_infrastructure() {
            let event_id = sentry::capture_error(&err);
            warn!(
                error = %err,
                kind = %err.kind(),
                sentry_event_id = %event_id,
                ?operation,
                "Cart operation failed"
            );
        } else {
            debug!(error = %err, kind = %err.kind(), ?operation, "Cart operation rejected");
        }
        self.sink.report_failure(err.kind(), err.user_message(operation));
        err
    }
}

fn stock_exceeded(stock: &StockSnapshot, requested: u32) -> CartError {
    CartError::StockExceeded {
        product_id: stock.id,
        requested,
        available: stock.amount,
    }
}

/// Read and decode the stored cart, falling back to empty on any problem.
async fn load_initial<M: PersistentMirror>(mirror: &M, key: &str) -> Cart {
    let stored = match mirror.load(key).await {
        Ok(Some(stored)) => stored,
        Ok(None) => return Cart::new(),
        Err(e) => {
            warn!(error = %e, "Failed to read stored cart, starting empty");
            return Cart::new();
        }
    };

    Cart::from_json(&stored).unwrap_or_else(|e| {
        warn!(error = %e, "Stored cart is not decodable, starting empty");
        Cart::new()
    })
}
