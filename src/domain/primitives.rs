//! Domain primitives: TimeMs and the string identifiers handed to us by the
//! storefront (shops, users, orders, products).

use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    pub fn as_ms(&self) -> i64 {
        self.0
    }
}

/// Error returned when an identifier is empty or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} must not be empty")]
pub struct EmptyIdError(pub &'static str);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            /// Trim and reject empty identifiers coming from request input.
            ///
            /// # Errors
            /// Returns an error if the identifier is blank.
            pub fn parse(input: &str) -> Result<Self, EmptyIdError> {
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    return Err(EmptyIdError($label));
                }
                Ok($name(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Affiliate storefront identifier.
    ShopId,
    "affiliateShopId"
);
string_id!(
    /// Account that owns one or more affiliate shops and receives payouts.
    UserId,
    "userId"
);
string_id!(
    /// Order identifier from the order subsystem.
    OrderId,
    "orderId"
);
string_id!(
    /// Product identifier from the catalog.
    ProductId,
    "productId"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_rejects_blank() {
        assert_eq!(ShopId::parse("  shop-1 ").unwrap().as_str(), "shop-1");
        assert_eq!(OrderId::parse("   "), Err(EmptyIdError("orderId")));
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&ProductId::new("p-9")).unwrap();
        assert_eq!(json, "\"p-9\"");
    }

    #[test]
    fn test_timems_ordering() {
        assert!(TimeMs::new(1000) < TimeMs::new(2000));
        assert!(TimeMs::now().as_ms() > 0);
    }
}
