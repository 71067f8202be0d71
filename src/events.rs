//! Domain events published to NATS when a client is configured.

use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced {
        order_number: String,
        user_id: Uuid,
        amount: i64,
        payment_method: String,
    },
    OrderPaid {
        order_number: String,
        gateway: String,
    },
    LowStock {
        product_id: Uuid,
        name: String,
        quantity: i32,
    },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "orders.placed",
            Self::OrderPaid { .. } => "orders.paid",
            Self::LowStock { .. } => "inventory.low_stock",
        }
    }
}

/// Best-effort publish. A missing client or a publish failure never affects
/// the request that raised the event.
pub async fn publish(nats: &Option<async_nats::Client>, event: DomainEvent) {
    let Some(client) = nats else { return };
    let payload = match serde_json::to_vec(&event) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!("failed to serialize event: {err}");
            return;
        }
    };
    if let Err(err) = client.publish(event.subject().to_string(), payload.into()).await {
        tracing::warn!("failed to publish {}: {err}", event.subject());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_map_to_subjects() {
        let event = DomainEvent::LowStock {
            product_id: Uuid::new_v4(),
            name: "Linen Shirt".into(),
            quantity: 3,
        };
        assert_eq!(event.subject(), "inventory.low_stock");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "low_stock");
        assert_eq!(json["quantity"], 3);
    }
}
