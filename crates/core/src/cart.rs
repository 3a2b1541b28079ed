//! Client-side shopping cart.
//!
//! [`CartStore`] owns the cart lines and a transient visibility flag.
//! Persistence is injected through the [`CartStorage`] port: the store reads
//! once at construction and writes after every mutation of the lines.
//! Opening or closing the cart never touches storage, so a restored cart
//! always starts closed.
//!
//! # Example
//!
//! ```rust
//! use vitrine_core::cart::{CartStore, MemoryCartStorage};
//! # use vitrine_core::{Cents, Product, ProductId};
//! # let product = Product {
//! #     id: ProductId::generate(),
//! #     sku: "CAF-001".into(),
//! #     name: "Café".into(),
//! #     description: String::new(),
//! #     price_cents: Cents::new(1999),
//! #     image: String::new(),
//! #     category: None,
//! #     in_stock: true,
//! # };
//!
//! let mut cart = CartStore::new(MemoryCartStorage::default());
//! cart.add_item(&product, 2);
//! assert_eq!(cart.total_items(), 2);
//! assert_eq!(cart.total_price(), Cents::new(3998));
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{Cents, Product, ProductId};

/// Key under which the cart snapshot is persisted.
pub const STORAGE_KEY: &str = "cart-storage";

/// Version written into the persisted envelope.
const SNAPSHOT_VERSION: u32 = 0;

/// One product and how many units of it are in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// `quantity × priceCents`.
    #[must_use]
    pub fn line_total(&self) -> Cents {
        self.product.price_cents.times(self.quantity)
    }
}

/// Errors from a cart persistence backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the underlying medium failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored snapshot could not be encoded or decoded.
    #[error("Corrupt cart snapshot: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Persistence port for cart lines.
///
/// Only the lines are persisted; the visibility flag is session state.
pub trait CartStorage {
    /// Load the last saved lines, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the medium is unreadable or the snapshot is
    /// corrupt.
    fn load(&self) -> Result<Option<Vec<CartLine>>, StorageError>;

    /// Replace the saved lines.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be written.
    fn save(&self, lines: &[CartLine]) -> Result<(), StorageError>;
}

#[derive(Serialize, Deserialize)]
struct SnapshotState {
    items: Vec<CartLine>,
}

/// Persisted document: `{"state": {"items": [...]}, "version": 0}`.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    state: SnapshotState,
    #[serde(default)]
    version: u32,
}

/// Encode lines into the persisted document format.
///
/// # Errors
///
/// Returns `StorageError::Corrupt` if serialization fails.
pub fn encode_snapshot(lines: &[CartLine]) -> Result<String, StorageError> {
    let snapshot = Snapshot {
        state: SnapshotState {
            items: lines.to_vec(),
        },
        version: SNAPSHOT_VERSION,
    };
    Ok(serde_json::to_string(&snapshot)?)
}

/// Decode a persisted document back into lines.
///
/// # Errors
///
/// Returns `StorageError::Corrupt` if the document is malformed.
pub fn decode_snapshot(raw: &str) -> Result<Vec<CartLine>, StorageError> {
    let snapshot: Snapshot = serde_json::from_str(raw)?;
    Ok(snapshot.state.items)
}

/// In-memory storage holding the encoded snapshot.
///
/// Clones share the same slot, so a test can keep a handle and rebuild a
/// store from it to simulate a reload.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStorage {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryCartStorage {
    /// The raw persisted document, if any.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Overwrite the raw persisted document.
    pub fn set_raw(&self, raw: impl Into<String>) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw.into());
    }
}

impl CartStorage for MemoryCartStorage {
    fn load(&self) -> Result<Option<Vec<CartLine>>, StorageError> {
        self.raw().as_deref().map(decode_snapshot).transpose()
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), StorageError> {
        self.set_raw(encode_snapshot(lines)?);
        Ok(())
    }
}

/// The cart state container.
#[derive(Debug)]
pub struct CartStore<S: CartStorage> {
    lines: Vec<CartLine>,
    is_open: bool,
    storage: S,
}

impl<S: CartStorage> CartStore<S> {
    /// Create a store, restoring lines from `storage`.
    ///
    /// An unreadable snapshot yields an empty cart. Restored lines are
    /// normalized: zero quantities are dropped and duplicate products merged.
    pub fn new(storage: S) -> Self {
        let lines = match storage.load() {
            Ok(Some(lines)) => normalize(lines),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to restore cart, starting empty");
                Vec::new()
            }
        };
        debug!(lines = lines.len(), "Cart restored");

        Self {
            lines,
            is_open: false,
            storage,
        }
    }

    /// Lines in display (insertion) order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// The line for a product, if present.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product.id == *product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether the cart panel is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    /// The injected storage backend.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Add `quantity` units of `product`, merging into an existing line.
    ///
    /// Stock is not checked here. Adding zero units is a no-op.
    pub fn add_item(&mut self, product: &Product, quantity: u32) {
        if quantity == 0 {
            return;
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product.id == product.id) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            self.lines.push(CartLine {
                product: product.clone(),
                quantity,
            });
        }
        self.persist();
    }

    /// Remove the line for `product_id`. Unknown ids are ignored.
    pub fn remove_item(&mut self, product_id: &ProductId) {
        let before = self.lines.len();
        self.lines.retain(|line| line.product.id != *product_id);
        if self.lines.len() != before {
            self.persist();
        }
    }

    /// Set the quantity of a line exactly; `quantity <= 0` removes it.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(product_id);
            return;
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(line) = self.lines.iter_mut().find(|l| l.product.id == *product_id) {
            line.quantity = quantity;
            self.persist();
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.persist();
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of `quantity × priceCents` over all lines.
    #[must_use]
    pub fn total_price(&self) -> Cents {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub const fn open(&mut self) {
        self.is_open = true;
    }

    pub const fn close(&mut self) {
        self.is_open = false;
    }

    pub const fn toggle(&mut self) {
        self.is_open = !self.is_open;
    }

    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.lines) {
            warn!(error = %e, "Failed to persist cart");
        }
    }
}

/// Drop empty lines and merge duplicates, keeping first-seen order.
fn normalize(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut out: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            continue;
        }
        if let Some(existing) = out.iter_mut().find(|l| l.product.id == line.product.id) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            out.push(line);
        }
    }
    out
}
