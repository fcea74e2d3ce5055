use crate::models::{CartTotals, LineItem, OrderDetails};
use rust_decimal::Decimal;

/// Session-scoped shopping cart.
///
/// One instance belongs to one checkout session: created when the session
/// starts, dropped when it ends. Totals are derived from the items on every
/// read, so they can never drift from the lines that produced them.
#[derive(Debug, Default, Clone)]
pub struct CartStore {
    items: Vec<LineItem>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, merging with an existing line for the same product id
    /// and size by summing quantities.
    pub fn add_item(&mut self, item: LineItem) {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|line| line.id == item.id && line.size == item.size)
        {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
    }

    /// Remove every line for the product id, across all sizes.
    /// A no-op when the product is not in the cart.
    pub fn remove_item(&mut self, product_id: u32) {
        self.items.retain(|line| line.id != product_id);
    }

    /// Set the quantity on every line for the product id. Quantities are
    /// stored as given; callers validate the 1..=10 range before calling.
    pub fn update_quantity(&mut self, product_id: u32, quantity: u32) {
        for line in self.items.iter_mut().filter(|line| line.id == product_id) {
            line.quantity = quantity;
        }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Recompute item count and subtotal from the current lines.
    pub fn totals(&self) -> CartTotals {
        CartTotals {
            total_items: self.items.iter().map(|line| line.quantity).sum(),
            total_price: self
                .items
                .iter()
                .map(|line| line.line_total())
                .sum::<Decimal>(),
        }
    }

    /// Snapshot the cart into the order payload posted at checkout.
    pub fn to_order_details(&self, delivery_price: Decimal) -> OrderDetails {
        let totals = self.totals();
        OrderDetails {
            items: self.items.clone(),
            total_price: totals.total_price,
            delivery_price,
            total_amount: totals.total_price + delivery_price,
        }
    }
}
