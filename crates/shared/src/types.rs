//! Domain status enums shared across crates.
//!
//! Each enum maps to a Postgres enum type of the same name. Wire format
//! (JSON) and storage format both use the SCREAMING_SNAKE_CASE variant
//! names, so a `PATCH .../status` body like `{"status": "PAID"}` binds
//! directly.

use serde::{Deserialize, Serialize};

/// Client lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "client_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientStatus {
    /// Created from the public interest form; not yet a subscriber.
    Prospect,
    Active,
    Suspended,
    Terminated,
}

/// Contract lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contract_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Pending,
    Active,
    Suspended,
    Cancelled,
}

/// Invoice lifecycle state.
///
/// OVERDUE is never inferred at read time; it is set explicitly, either by
/// an operator or by the worker's due-date sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
}

/// Service plan category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanCategory {
    Residential,
    Business,
}

/// Recurring billing interval on a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "billing_cycle", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    Annual,
}

/// Kind of uploaded proof-of-payment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "receipt_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptKind {
    WalletTransfer,
    BankDeposit,
    BankTransfer,
}

impl std::str::FromStr for ReceiptKind {
    type Err = ();

    /// Parse the wire name, as sent in multipart form fields.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WALLET_TRANSFER" => Ok(ReceiptKind::WalletTransfer),
            "BANK_DEPOSIT" => Ok(ReceiptKind::BankDeposit),
            "BANK_TRANSFER" => Ok(ReceiptKind::BankTransfer),
            _ => Err(()),
        }
    }
}

/// Operator account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::User => "USER",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_json_uses_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&ClientStatus::Prospect).unwrap(),
            "\"PROSPECT\""
        );
        assert_eq!(
            serde_json::to_string(&ReceiptKind::WalletTransfer).unwrap(),
            "\"WALLET_TRANSFER\""
        );
        let parsed: InvoiceStatus = serde_json::from_str("\"OVERDUE\"").unwrap();
        assert_eq!(parsed, InvoiceStatus::Overdue);
    }

    #[test]
    fn role_display_matches_wire_format() {
        assert_eq!(UserRole::Admin.to_string(), "ADMIN");
        assert_eq!(UserRole::User.to_string(), "USER");
    }
}
