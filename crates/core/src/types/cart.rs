//! Cart and line-item types.
//!
//! A [`Cart`] is an ordered list of [`LineItem`]s, unique by product id.
//! Carts are values: every edit helper returns a new cart and leaves the
//! receiver untouched, so a rejected edit can simply be dropped.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::id::ProductId;
use super::product::Product;

/// One product in the cart with its requested quantity.
///
/// Serialized flat: the catalog fields plus an `amount` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Catalog data captured when the product was first added.
    #[serde(flatten)]
    pub product: Product,
    /// Requested quantity, always at least 1 in an accepted cart.
    pub amount: u32,
}

impl LineItem {
    /// Create a line item.
    #[must_use]
    pub const fn new(product: Product, amount: u32) -> Self {
        Self { product, amount }
    }

    /// The product this line refers to.
    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.product.id
    }

    /// Unit price multiplied by quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.amount)
    }
}

/// Ordered collection of line items, unique by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from raw items.
    ///
    /// Items with a zero amount are dropped and repeated product ids keep
    /// only their first occurrence, so the result always satisfies the cart
    /// invariants regardless of where the items came from.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = LineItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            if item.amount > 0 && !cart.contains(item.id()) {
                cart.items.push(item);
            }
        }
        cart
    }

    /// Decode a cart from its stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if `json` is not an array of line items.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Encode the cart into its stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Quantity currently requested for a product, 0 when absent.
    #[must_use]
    pub fn amount_of(&self, id: ProductId) -> u32 {
        self.get(id).map_or(0, |item| item.amount)
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.amount)).sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Copy of this cart with the line for `id` set to `amount`.
    ///
    /// Returns an unchanged copy if the product is not in the cart.
    #[must_use]
    pub fn with_amount(&self, id: ProductId, amount: u32) -> Self {
        let items = self
            .items
            .iter()
            .map(|item| {
                if item.id() == id {
                    LineItem::new(item.product.clone(), amount)
                } else {
                    item.clone()
                }
            })
            .collect();
        Self { items }
    }

    /// Copy of this cart with `item` appended.
    ///
    /// An existing line for the same product is replaced in place instead,
    /// keeping ids unique.
    #[must_use]
    pub fn with_item(&self, item: LineItem) -> Self {
        let mut items = self.items.clone();
        match items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
        Self { items }
    }

    /// Copy of this cart without the line for `id`.
    #[must_use]
    pub fn without(&self, id: ProductId) -> Self {
        Self {
            items: self
                .items
                .iter()
                .filter(|item| item.id() != id)
                .cloned()
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for Cart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<LineItem>::deserialize(deserializer).map(Self::from_items)
    }
}
