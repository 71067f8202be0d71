//! Order snapshot types, statuses and order-number generation.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an order as shown in the stock console.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Order Placed")]
    OrderPlaced,
    Packing,
    Shipped,
    #[serde(rename = "Out for delivery")]
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderPlaced => "Order Placed",
            Self::Packing => "Packing",
            Self::Shipped => "Shipped",
            Self::OutForDelivery => "Out for delivery",
            Self::Delivered => "Delivered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Order Placed" => Some(Self::OrderPlaced),
            "Packing" => Some(Self::Packing),
            "Shipped" => Some(Self::Shipped),
            "Out for delivery" => Some(Self::OutForDelivery),
            "Delivered" => Some(Self::Delivered),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "COD")]
    Cod,
    Stripe,
    Razorpay,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cod => "COD",
            Self::Stripe => "Stripe",
            Self::Razorpay => "Razorpay",
        }
    }
}

/// One line of an order, snapshotted at placement time so later product edits
/// do not rewrite order history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: Uuid,
    pub name: String,
    /// Unit price in minor currency units.
    pub price: i64,
    pub size: String,
    pub quantity: u32,
}

/// Shipping address snapshot stored on the order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub street: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub zipcode: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Generates a human-readable order number: `ORD-<last six digits of the
/// epoch milliseconds>-<four-digit random suffix>`.
pub fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(1000..10_000);
    format!("ORD-{:06}-{suffix}", millis % 1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_shape() {
        let n = generate_order_number();
        let parts: Vec<&str> = n.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 6);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn status_round_trip() {
        for s in [
            OrderStatus::OrderPlaced,
            OrderStatus::Packing,
            OrderStatus::Shipped,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            assert_eq!(OrderStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(OrderStatus::parse("Lost"), None);
    }

    #[test]
    fn status_serializes_with_spaces() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"Out for delivery\"");
    }

    #[test]
    fn line_item_snapshot_round_trip() {
        let item = LineItem {
            product_id: Uuid::new_v4(),
            name: "Linen Shirt".into(),
            price: 350_000,
            size: "M".into(),
            quantity: 2,
        };
        let value = serde_json::to_value(&item).unwrap();
        let back: LineItem = serde_json::from_value(value).unwrap();
        assert_eq!(back.quantity, 2);
        assert_eq!(back.price, 350_000);
    }
}
