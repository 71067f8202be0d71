//! Per-user cart stored as a `product id -> size -> quantity` map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cart(pub HashMap<String, HashMap<String, u32>>);

impl Cart {
    /// Adds one unit of an item in a given size, merging with any existing
    /// entry.
    pub fn add(&mut self, item_id: &str, size: &str) {
        let sizes = self.0.entry(item_id.to_string()).or_default();
        *sizes.entry(size.to_string()).or_insert(0) += 1;
    }

    /// Sets the quantity for an item/size. Zero removes the entry, and an
    /// item with no remaining sizes is dropped from the map.
    pub fn set(&mut self, item_id: &str, size: &str, quantity: u32) {
        if quantity == 0 {
            if let Some(sizes) = self.0.get_mut(item_id) {
                sizes.remove(size);
                if sizes.is_empty() {
                    self.0.remove(item_id);
                }
            }
        } else {
            self.0
                .entry(item_id.to_string())
                .or_default()
                .insert(size.to_string(), quantity);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_merges_quantities() {
        let mut cart = Cart::default();
        cart.add("p1", "M");
        cart.add("p1", "M");
        cart.add("p1", "L");
        assert_eq!(cart.0["p1"]["M"], 2);
        assert_eq!(cart.0["p1"]["L"], 1);
    }

    #[test]
    fn set_zero_removes_entry() {
        let mut cart = Cart::default();
        cart.add("p1", "M");
        cart.set("p1", "M", 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn set_overwrites_quantity() {
        let mut cart = Cart::default();
        cart.add("p1", "M");
        cart.set("p1", "M", 7);
        assert_eq!(cart.0["p1"]["M"], 7);
    }
}
