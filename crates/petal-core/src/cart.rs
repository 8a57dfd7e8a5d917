//! # Cart Types
//!
//! A guest's cart: ordered items, the single-delivery-mode invariant,
//! and the aggregate total that checkout charges. The total computed
//! here is the single source of truth — it is recomputed server-side at
//! charge time, never trusted from client input.

use crate::error::{OrderError, OrderResult};
use crate::money::{Currency, Price};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest card message accepted on an item
pub const MAX_CARD_MESSAGE_LEN: usize = 250;

/// An add-on attached to a cart item (chocolates, balloons, a vase)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upsell {
    /// Display name
    pub name: String,
    /// Unit price
    pub unit_price: Price,
    /// Quantity; zero means "remove" and is dropped on write
    pub quantity: u32,
}

impl Upsell {
    pub fn new(name: impl Into<String>, unit_price: Price, quantity: u32) -> Self {
        Self {
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// Extended price for this add-on line
    pub fn total(&self) -> i64 {
        self.unit_price.amount * self.quantity as i64
    }
}

/// One arrangement line in a cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product ID
    pub product_id: String,

    /// Product name (denormalized for display)
    pub name: String,

    /// Arrangement size (e.g. "Small", "Medium", "Large")
    pub size: String,

    /// Price of the arrangement as configured
    pub unit_price: Price,

    /// Quantity; a line is priced once regardless (duplicates are
    /// separate lines), so this is informational
    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// Add-ons attached to this line
    #[serde(default)]
    pub upsells: Vec<Upsell>,

    /// Whether this line is fulfilled by delivery (vs pickup)
    pub is_delivery: bool,

    /// Quoted delivery fee; must be zero unless `is_delivery`
    #[serde(default)]
    pub delivery_cost: Option<Price>,

    /// Destination postal code, present for delivery lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    /// Gift card message, at most [`MAX_CARD_MESSAGE_LEN`] characters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_message: Option<String>,

    /// Requested delivery date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<DateTime<Utc>>,
}

fn default_quantity() -> u32 {
    1
}

impl CartItem {
    /// Validate this item's own invariants.
    ///
    /// The cross-item delivery-mode invariant is the cart's job; this
    /// checks only what one line can violate alone.
    pub fn validate(&self, currency: Currency) -> OrderResult<()> {
        if let Some(ref msg) = self.card_message {
            let length = msg.chars().count();
            if length > MAX_CARD_MESSAGE_LEN {
                return Err(OrderError::CardMessageTooLong {
                    length,
                    max: MAX_CARD_MESSAGE_LEN,
                });
            }
        }

        if !self.is_delivery {
            if let Some(cost) = self.delivery_cost {
                if !cost.is_zero() {
                    return Err(OrderError::InvalidRequest(
                        "pickup item cannot carry a delivery cost".to_string(),
                    ));
                }
            }
        }

        if self.unit_price.amount < 0 {
            return Err(OrderError::InvalidPrice {
                message: format!("negative unit price on {}", self.product_id),
            });
        }

        let mut currencies = vec![self.unit_price.currency];
        currencies.extend(self.upsells.iter().map(|u| u.unit_price.currency));
        if let Some(cost) = self.delivery_cost {
            currencies.push(cost.currency);
        }
        if let Some(other) = currencies.iter().find(|c| **c != currency) {
            return Err(OrderError::UnsupportedCurrency {
                currency: other.to_string(),
            });
        }

        Ok(())
    }

    /// Drop add-ons whose quantity has been set to zero
    pub fn normalize(&mut self) {
        self.upsells.retain(|u| u.quantity > 0);
    }

    /// This line's contribution to the cart total
    pub fn total(&self) -> i64 {
        let upsell_sum: i64 = self.upsells.iter().map(Upsell::total).sum();
        let delivery = if self.is_delivery {
            self.delivery_cost.map_or(0, |c| c.amount)
        } else {
            0
        };
        self.unit_price.amount + upsell_sum + delivery
    }

    fn mode_name(is_delivery: bool) -> &'static str {
        if is_delivery {
            "delivery"
        } else {
            "pickup"
        }
    }
}

/// A guest's cart: ordered items plus the fixed fulfillment mode.
///
/// The mode is `None` only while the cart is empty; the first item fixes
/// it and every later write must agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Owning guest identifier
    pub guest_id: String,
    /// Ordered item lines
    pub items: Vec<CartItem>,
    /// Fulfillment mode shared by every item, `None` when empty
    pub delivery_mode: Option<bool>,
}

impl Cart {
    /// Empty cart for a guest
    pub fn empty(guest_id: impl Into<String>) -> Self {
        Self {
            guest_id: guest_id.into(),
            items: Vec::new(),
            delivery_mode: None,
        }
    }

    /// Rebuild a cart from a stored item list; the mode derives from the
    /// first item (or unset when the list is empty).
    pub fn from_items(guest_id: impl Into<String>, items: Vec<CartItem>) -> Self {
        let delivery_mode = items.first().map(|i| i.is_delivery);
        Self {
            guest_id: guest_id.into(),
            items,
            delivery_mode,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check an incoming item against the fixed mode without mutating
    pub fn check_mode(&self, item: &CartItem) -> OrderResult<()> {
        match self.delivery_mode {
            Some(mode) if mode != item.is_delivery => Err(OrderError::DeliveryModeConflict {
                cart_mode: CartItem::mode_name(mode),
                item_mode: CartItem::mode_name(item.is_delivery),
            }),
            _ => Ok(()),
        }
    }

    /// Check that a whole replacement list agrees on one mode
    pub fn check_uniform_mode(items: &[CartItem]) -> OrderResult<()> {
        let mut modes = items.iter().map(|i| i.is_delivery);
        if let Some(first) = modes.next() {
            if let Some(other) = modes.find(|m| *m != first) {
                return Err(OrderError::DeliveryModeConflict {
                    cart_mode: CartItem::mode_name(first),
                    item_mode: CartItem::mode_name(other),
                });
            }
        }
        Ok(())
    }

    /// Aggregate total: for each line, `unit_price + Σ(upsell price ×
    /// qty) + delivery cost when delivering`.
    pub fn total(&self, currency: Currency) -> Price {
        let amount: i64 = self.items.iter().map(CartItem::total).sum();
        Price::from_cents(amount, currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cad(amount: f64) -> Price {
        Price::new(amount, Currency::CAD)
    }

    fn delivery_item(product_id: &str, price: f64, delivery_cost: f64) -> CartItem {
        CartItem {
            product_id: product_id.to_string(),
            name: product_id.to_string(),
            size: "Medium".to_string(),
            unit_price: cad(price),
            quantity: 1,
            upsells: Vec::new(),
            is_delivery: true,
            delivery_cost: Some(cad(delivery_cost)),
            postal_code: Some("V2M 1V8".to_string()),
            card_message: None,
            delivery_date: None,
        }
    }

    fn pickup_item(product_id: &str, price: f64) -> CartItem {
        CartItem {
            product_id: product_id.to_string(),
            name: product_id.to_string(),
            size: "Medium".to_string(),
            unit_price: cad(price),
            quantity: 1,
            upsells: Vec::new(),
            is_delivery: false,
            delivery_cost: None,
            postal_code: None,
            card_message: None,
            delivery_date: None,
        }
    }

    #[test]
    fn test_item_total_with_upsells() {
        let mut item = delivery_item("roses-dozen", 50.0, 8.0);
        item.upsells.push(Upsell::new("Chocolates", cad(5.0), 2));
        // 50.00 + 2×5.00 + 8.00
        assert_eq!(item.total(), 6800);
    }

    #[test]
    fn test_pickup_ignores_delivery_cost_in_total() {
        let mut item = pickup_item("tulips", 20.0);
        item.delivery_cost = Some(Price::zero(Currency::CAD));
        assert_eq!(item.total(), 2000);
    }

    #[test]
    fn test_cart_total_scenario() {
        // Scenario: delivery item at 50 with 8 delivery → 58; then a 20
        // item with one upsell qty 2 @ 5 → 88.
        let mut cart = Cart::empty("guest-1");
        cart.items.push(delivery_item("roses-dozen", 50.0, 8.0));
        cart.delivery_mode = Some(true);
        assert_eq!(cart.total(Currency::CAD).amount, 5800);

        let mut second = delivery_item("lilies", 20.0, 0.0);
        second.upsells.push(Upsell::new("Balloons", cad(5.0), 2));
        cart.items.push(second);
        assert_eq!(cart.total(Currency::CAD).amount, 8800);
    }

    #[test]
    fn test_mode_conflict_detected() {
        let cart = Cart::from_items("guest-1", vec![delivery_item("roses-dozen", 50.0, 8.0)]);
        assert_eq!(cart.delivery_mode, Some(true));

        let err = cart.check_mode(&pickup_item("tulips", 20.0)).unwrap_err();
        assert!(matches!(err, OrderError::DeliveryModeConflict { .. }));
    }

    #[test]
    fn test_empty_cart_accepts_either_mode() {
        let cart = Cart::empty("guest-1");
        assert!(cart.check_mode(&pickup_item("tulips", 20.0)).is_ok());
        assert!(cart.check_mode(&delivery_item("roses-dozen", 50.0, 8.0)).is_ok());
    }

    #[test]
    fn test_uniform_mode_check() {
        let mixed = vec![delivery_item("a", 10.0, 5.0), pickup_item("b", 10.0)];
        assert!(matches!(
            Cart::check_uniform_mode(&mixed),
            Err(OrderError::DeliveryModeConflict { .. })
        ));
        assert!(Cart::check_uniform_mode(&[]).is_ok());
    }

    #[test]
    fn test_card_message_length() {
        let mut item = pickup_item("tulips", 20.0);
        item.card_message = Some("a".repeat(MAX_CARD_MESSAGE_LEN));
        assert!(item.validate(Currency::CAD).is_ok());

        item.card_message = Some("a".repeat(MAX_CARD_MESSAGE_LEN + 1));
        assert!(matches!(
            item.validate(Currency::CAD),
            Err(OrderError::CardMessageTooLong { length: 251, .. })
        ));
    }

    #[test]
    fn test_pickup_with_nonzero_delivery_cost_rejected() {
        let mut item = pickup_item("tulips", 20.0);
        item.delivery_cost = Some(cad(8.0));
        assert!(matches!(
            item.validate(Currency::CAD),
            Err(OrderError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let mut item = pickup_item("tulips", 20.0);
        item.upsells
            .push(Upsell::new("Chocolates", Price::new(5.0, Currency::USD), 1));
        assert!(matches!(
            item.validate(Currency::CAD),
            Err(OrderError::UnsupportedCurrency { .. })
        ));
    }

    #[test]
    fn test_normalize_drops_zero_quantity_upsells() {
        let mut item = pickup_item("tulips", 20.0);
        item.upsells.push(Upsell::new("Chocolates", cad(5.0), 0));
        item.upsells.push(Upsell::new("Balloons", cad(3.0), 1));
        item.normalize();
        assert_eq!(item.upsells.len(), 1);
        assert_eq!(item.upsells[0].name, "Balloons");
    }

    #[test]
    fn test_from_items_derives_mode() {
        let cart = Cart::from_items("g", vec![pickup_item("a", 10.0)]);
        assert_eq!(cart.delivery_mode, Some(false));
        let empty = Cart::from_items("g", Vec::new());
        assert_eq!(empty.delivery_mode, None);
    }
}
