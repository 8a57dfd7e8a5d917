//! # Cart Store
//!
//! Per-guest cart persistence behind an atomic read-modify-write
//! surface. Concurrency comes from independent requests for the same
//! guest (two browser tabs); the store keeps one async mutex per guest
//! id and holds it across the whole load → validate → save sequence, so
//! two concurrent appends can never drop one.

use crate::cart::{Cart, CartItem};
use crate::error::OrderResult;
use crate::money::{Currency, Price};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Persistence seam for cart item lists.
///
/// Implementations only load and save; atomicity per guest id is the
/// store's responsibility, and it only calls these under the guest's
/// lock.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Load a guest's stored items, `None` when no cart exists
    async fn load_cart(&self, guest_id: &str) -> OrderResult<Option<Vec<CartItem>>>;

    /// Overwrite a guest's stored items
    async fn save_cart(&self, guest_id: &str, items: &[CartItem]) -> OrderResult<()>;
}

/// Type alias for a shared repository handle
pub type BoxedCartRepository = Arc<dyn CartRepository>;

/// In-memory repository; the default backing for the store
#[derive(Debug, Default)]
pub struct MemoryCartRepository {
    carts: tokio::sync::RwLock<HashMap<String, Vec<CartItem>>>,
}

impl MemoryCartRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartRepository for MemoryCartRepository {
    async fn load_cart(&self, guest_id: &str) -> OrderResult<Option<Vec<CartItem>>> {
        Ok(self.carts.read().await.get(guest_id).cloned())
    }

    async fn save_cart(&self, guest_id: &str, items: &[CartItem]) -> OrderResult<()> {
        self.carts
            .write()
            .await
            .insert(guest_id.to_string(), items.to_vec());
        Ok(())
    }
}

/// Cart operations with the single-delivery-mode invariant enforced on
/// every write.
pub struct CartStore {
    repo: BoxedCartRepository,
    currency: Currency,
    /// Per-guest serialization point for read-modify-write sequences
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CartStore {
    pub fn new(repo: BoxedCartRepository, currency: Currency) -> Self {
        Self {
            repo,
            currency,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// In-memory store, the default wiring
    pub fn in_memory(currency: Currency) -> Self {
        Self::new(Arc::new(MemoryCartRepository::new()), currency)
    }

    /// Currency all cart amounts are denominated in
    pub fn currency(&self) -> Currency {
        self.currency
    }

    async fn guest_lock(&self, guest_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(guest_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Fetch a guest's cart; an empty cart when none exists
    pub async fn get(&self, guest_id: &str) -> OrderResult<Cart> {
        let items = self.repo.load_cart(guest_id).await?.unwrap_or_default();
        Ok(Cart::from_items(guest_id, items))
    }

    /// Idempotent whole-cart overwrite.
    ///
    /// The replacement list must agree on one fulfillment mode and pass
    /// item validation; zero-quantity upsells are dropped on the way in.
    /// An empty list resets the delivery mode to unset.
    pub async fn replace(&self, guest_id: &str, mut items: Vec<CartItem>) -> OrderResult<Cart> {
        for item in &mut items {
            item.validate(self.currency)?;
            item.normalize();
        }
        Cart::check_uniform_mode(&items)?;

        let lock = self.guest_lock(guest_id).await;
        let _guard = lock.lock().await;
        self.repo.save_cart(guest_id, &items).await?;
        debug!(guest_id, count = items.len(), "cart replaced");
        Ok(Cart::from_items(guest_id, items))
    }

    /// Append one item, rejecting a fulfillment-mode mismatch before any
    /// mutation.
    pub async fn append(&self, guest_id: &str, mut item: CartItem) -> OrderResult<Cart> {
        item.validate(self.currency)?;
        item.normalize();

        let lock = self.guest_lock(guest_id).await;
        let _guard = lock.lock().await;

        let items = self.repo.load_cart(guest_id).await?.unwrap_or_default();
        let cart = Cart::from_items(guest_id, items);
        cart.check_mode(&item)?;

        let mut items = cart.items;
        items.push(item);
        self.repo.save_cart(guest_id, &items).await?;
        debug!(guest_id, count = items.len(), "cart item appended");
        Ok(Cart::from_items(guest_id, items))
    }

    /// Explicit clear; the only write that resets the delivery mode
    pub async fn clear(&self, guest_id: &str) -> OrderResult<Cart> {
        self.replace(guest_id, Vec::new()).await
    }

    /// Recompute the aggregate total from stored state.
    ///
    /// Checkout charges exactly this; client-supplied totals are never
    /// trusted.
    pub async fn total(&self, guest_id: &str) -> OrderResult<Price> {
        let cart = self.get(guest_id).await?;
        Ok(cart.total(self.currency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrderError;

    fn item(product_id: &str, price: f64, is_delivery: bool, delivery_cost: f64) -> CartItem {
        CartItem {
            product_id: product_id.to_string(),
            name: product_id.to_string(),
            size: "Medium".to_string(),
            unit_price: Price::new(price, Currency::CAD),
            quantity: 1,
            upsells: Vec::new(),
            is_delivery,
            delivery_cost: is_delivery.then(|| Price::new(delivery_cost, Currency::CAD)),
            postal_code: None,
            card_message: None,
            delivery_date: None,
        }
    }

    #[tokio::test]
    async fn test_get_missing_cart_is_empty() {
        let store = CartStore::in_memory(Currency::CAD);
        let cart = store.get("guest-1").await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.delivery_mode, None);
    }

    #[tokio::test]
    async fn test_append_fixes_mode_and_totals() {
        let store = CartStore::in_memory(Currency::CAD);

        let cart = store
            .append("guest-1", item("roses-dozen", 50.0, true, 8.0))
            .await
            .unwrap();
        assert_eq!(cart.delivery_mode, Some(true));
        assert_eq!(store.total("guest-1").await.unwrap().amount, 5800);

        let mut second = item("lilies", 20.0, true, 0.0);
        second.upsells.push(crate::cart::Upsell::new(
            "Chocolates",
            Price::new(5.0, Currency::CAD),
            2,
        ));
        store.append("guest-1", second).await.unwrap();
        assert_eq!(store.total("guest-1").await.unwrap().amount, 8800);
    }

    #[tokio::test]
    async fn test_mode_conflict_leaves_cart_unchanged() {
        let store = CartStore::in_memory(Currency::CAD);
        store
            .append("guest-1", item("roses-dozen", 50.0, true, 8.0))
            .await
            .unwrap();
        let before = store.total("guest-1").await.unwrap();

        let err = store
            .append("guest-1", item("tulips", 20.0, false, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::DeliveryModeConflict { .. }));

        let cart = store.get("guest-1").await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(store.total("guest-1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_replace_empty_resets_mode() {
        let store = CartStore::in_memory(Currency::CAD);
        store
            .append("guest-1", item("roses-dozen", 50.0, true, 8.0))
            .await
            .unwrap();

        let cart = store.replace("guest-1", Vec::new()).await.unwrap();
        assert_eq!(cart.delivery_mode, None);

        // Mode is free again: a pickup item is now accepted
        let cart = store
            .append("guest-1", item("tulips", 20.0, false, 0.0))
            .await
            .unwrap();
        assert_eq!(cart.delivery_mode, Some(false));
    }

    #[tokio::test]
    async fn test_replace_rejects_mixed_modes() {
        let store = CartStore::in_memory(Currency::CAD);
        let err = store
            .replace(
                "guest-1",
                vec![
                    item("roses-dozen", 50.0, true, 8.0),
                    item("tulips", 20.0, false, 0.0),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::DeliveryModeConflict { .. }));
        assert!(store.get("guest-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_drops_zero_quantity_upsells() {
        let store = CartStore::in_memory(Currency::CAD);
        let mut line = item("roses-dozen", 50.0, true, 8.0);
        line.upsells.push(crate::cart::Upsell::new(
            "Chocolates",
            Price::new(5.0, Currency::CAD),
            0,
        ));
        let cart = store.replace("guest-1", vec![line]).await.unwrap();
        assert!(cart.items[0].upsells.is_empty());
    }

    #[tokio::test]
    async fn test_total_round_trips_through_reload() {
        let store = CartStore::in_memory(Currency::CAD);
        store
            .append("guest-1", item("roses-dozen", 50.0, true, 8.0))
            .await
            .unwrap();
        let before = store.total("guest-1").await.unwrap();
        let reloaded = store.get("guest-1").await.unwrap();
        assert_eq!(reloaded.total(Currency::CAD), before);
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_nothing() {
        let store = Arc::new(CartStore::in_memory(Currency::CAD));

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .append("guest-1", item(&format!("product-{i}"), 10.0, true, 5.0))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let cart = store.get("guest-1").await.unwrap();
        assert_eq!(cart.items.len(), 16);
    }

    #[tokio::test]
    async fn test_carts_are_isolated_per_guest() {
        let store = CartStore::in_memory(Currency::CAD);
        store
            .append("guest-1", item("roses-dozen", 50.0, true, 8.0))
            .await
            .unwrap();
        store
            .append("guest-2", item("tulips", 20.0, false, 0.0))
            .await
            .unwrap();

        assert_eq!(store.get("guest-1").await.unwrap().delivery_mode, Some(true));
        assert_eq!(store.get("guest-2").await.unwrap().delivery_mode, Some(false));
    }
}
