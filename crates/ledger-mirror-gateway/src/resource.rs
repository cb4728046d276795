// crates/ledger-mirror-gateway/src/resource.rs
// ============================================================================
// Module: Remote Resource Registry
// Description: Static descriptions of every remote resource type.
// Purpose: Drive the generic resource client from per-resource metadata.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The remote API is uneven: resources differ in endpoint path, in which
//! field carries their identifier, in whether a detail endpoint exists, and
//! in whether they accept mutations at all. Each quirk lives here as data so
//! the client stays generic. Identifier aliases are tried in declaration
//! order; the first present field wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// SECTION: Resource Specification
// ============================================================================

/// How the client fetches a single item of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailStrategy {
    /// Detail endpoint is authoritative for absence (404 is a miss) but
    /// flaky under load; fall back to a list scan on server errors only.
    GetWithServerErrorFallback,
    /// Detail endpoint exists but is unreliable; fall back to a list scan
    /// when it answers 404 or a server error.
    GetWithListFallback,
    /// Detail endpoint is slower than the list; scan the list first and only
    /// hit the detail endpoint on a miss.
    ListLookup,
    /// No detail endpoint; single items are served by a list scan and
    /// mutations are unsupported.
    ListOnly,
}

/// Static description of one remote resource type.
///
/// # Invariants
/// - `id_aliases` is non-empty and ordered by preference.
/// - `mutable` is false for every [`DetailStrategy::ListOnly`] resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Stable resource label used in cache keys and audit events.
    pub label: &'static str,
    /// Endpoint path relative to the API base URL.
    pub path: &'static str,
    /// Identifier field aliases, in lookup order.
    pub id_aliases: &'static [&'static str],
    /// Single-item fetch strategy.
    pub detail: DetailStrategy,
    /// Whether create/update/patch/delete are supported.
    pub mutable: bool,
}

impl ResourceSpec {
    /// Extracts the identifier from an item, trying aliases in order.
    ///
    /// Numeric identifiers are rendered in decimal; string identifiers pass
    /// through unchanged. Empty strings do not count as identifiers.
    #[must_use]
    pub fn id_of(&self, item: &Value) -> Option<String> {
        for alias in self.id_aliases {
            match item.get(alias) {
                Some(Value::Number(id)) => return Some(id.to_string()),
                Some(Value::String(id)) if !id.is_empty() => return Some(id.clone()),
                _ => {}
            }
        }
        None
    }

    /// Returns the detail endpoint path for one item.
    #[must_use]
    pub fn item_path(&self, id: i64) -> String {
        format!("{}/{id}", self.path)
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Every resource type the mirror understands.
pub const RESOURCES: &[ResourceSpec] = &[
    ResourceSpec {
        label: "product",
        path: "API/1.1/productBean",
        id_aliases: &["product_id", "productId", "ID", "id"],
        detail: DetailStrategy::GetWithListFallback,
        mutable: true,
    },
    ResourceSpec {
        label: "customer",
        path: "API/1.1/customerBean",
        id_aliases: &["customer_id", "customerId", "ID", "id"],
        detail: DetailStrategy::ListLookup,
        mutable: true,
    },
    ResourceSpec {
        label: "price_list",
        path: "API/1.1/priceListBean",
        id_aliases: &["priceListID", "priceListId", "ID", "id"],
        detail: DetailStrategy::GetWithServerErrorFallback,
        mutable: true,
    },
    ResourceSpec {
        label: "sales_invoice",
        path: "API/1.1/salesInvoiceBean",
        id_aliases: &["transactionid", "transactionId", "ID", "id"],
        detail: DetailStrategy::GetWithServerErrorFallback,
        mutable: true,
    },
    ResourceSpec {
        label: "delivery_note",
        path: "API/1.1/deliveryNoteBean",
        id_aliases: &["transactionId", "ID", "id"],
        detail: DetailStrategy::GetWithServerErrorFallback,
        mutable: true,
    },
    ResourceSpec {
        label: "salesperson",
        path: "API/1.1/salespersonBean",
        id_aliases: &["ID", "id"],
        detail: DetailStrategy::ListOnly,
        mutable: false,
    },
    ResourceSpec {
        label: "currency",
        path: "API/1.1/currencyBean",
        id_aliases: &["ID", "id"],
        detail: DetailStrategy::ListOnly,
        mutable: false,
    },
    ResourceSpec {
        label: "tax_category",
        path: "API/1.1/taxCategory",
        id_aliases: &["ID", "id"],
        detail: DetailStrategy::ListOnly,
        mutable: false,
    },
    ResourceSpec {
        label: "tax_identity",
        path: "API/1.1/taxIdentity",
        id_aliases: &["ID", "id"],
        detail: DetailStrategy::ListOnly,
        mutable: false,
    },
    ResourceSpec {
        label: "warehouse",
        path: "API/1.1/warehouses",
        id_aliases: &["ID", "id"],
        detail: DetailStrategy::ListOnly,
        mutable: false,
    },
];

/// Looks up a resource specification by label.
#[must_use]
pub fn resource_spec(label: &str) -> Option<&'static ResourceSpec> {
    RESOURCES.iter().find(|spec| spec.label == label)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Panic-based assertions are permitted in tests."
    )]

    use serde_json::json;

    use super::*;

    #[test]
    fn registry_invariants_hold() {
        for spec in RESOURCES {
            assert!(!spec.id_aliases.is_empty(), "{} has no id aliases", spec.label);
            if spec.detail == DetailStrategy::ListOnly {
                assert!(!spec.mutable, "{} is list-only but mutable", spec.label);
            }
        }
    }

    #[test]
    fn id_aliases_are_tried_in_order() {
        let product = resource_spec("product").unwrap();
        let item = json!({ "id": 9, "product_id": 7 });
        assert_eq!(product.id_of(&item), Some("7".to_string()));
        assert_eq!(product.id_of(&json!({ "ID": "abc" })), Some("abc".to_string()));
        assert_eq!(product.id_of(&json!({ "ID": "" })), None);
        assert_eq!(product.id_of(&json!({ "name": "x" })), None);
    }

    #[test]
    fn unknown_labels_are_rejected() {
        assert!(resource_spec("ledger").is_none());
    }

    #[test]
    fn item_paths_append_the_identifier() {
        let customer = resource_spec("customer").unwrap();
        assert_eq!(customer.item_path(42), "API/1.1/customerBean/42");
    }
}
