//! Payment method reference entity.

use serde::{Deserialize, Serialize};

/// How a payment was (or will be) made.
///
/// Methods with `requires_reference` set demand an external reference
/// number at purchase time (bank transfer receipt, voucher code, etc.).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Unique method key, e.g. "stripe", "manual", "qr".
    pub key: String,

    /// Display name.
    pub name: String,

    /// Whether an external reference must accompany the purchase.
    pub requires_reference: bool,

    /// Sort order for catalog listings.
    pub display_order: i32,

    /// Whether the method is currently offered.
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_serializes_to_json() {
        let method = PaymentMethod {
            key: "qr".to_string(),
            name: "QR transfer".to_string(),
            requires_reference: true,
            display_order: 2,
            active: true,
        };
        let json = serde_json::to_string(&method).unwrap();
        assert!(json.contains("\"requires_reference\":true"));
    }
}
