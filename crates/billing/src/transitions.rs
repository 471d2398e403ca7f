//! Lifecycle transition rules for invoices, contracts, and clients.
//!
//! Every status-changing operation consults these tables before writing.
//! Setting a status to its current value is an idempotent no-op success;
//! terminal states (PAID, CANCELLED, TERMINATED) accept no further
//! transitions unless the caller passes an explicit administrative
//! override, which is logged at WARN by the route layer.

use linkwave_shared::{ClientStatus, ContractStatus, InvoiceStatus};

use crate::error::{BillingError, BillingResult};

/// Outcome of a permitted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Target equals current status; nothing to write.
    Unchanged,
    /// Legal move; caller should persist the new status.
    Changed,
}

/// Whether an invoice may move from `from` to `to`.
pub fn invoice_transition_allowed(from: InvoiceStatus, to: InvoiceStatus) -> bool {
    use InvoiceStatus::*;
    matches!(
        (from, to),
        (Pending, Paid) | (Pending, Overdue) | (Overdue, Paid)
    )
}

/// Whether a contract may move from `from` to `to`.
pub fn contract_transition_allowed(from: ContractStatus, to: ContractStatus) -> bool {
    use ContractStatus::*;
    matches!(
        (from, to),
        (Pending, Active)
            | (Pending, Cancelled)
            | (Active, Suspended)
            | (Active, Cancelled)
            | (Suspended, Active)
            | (Suspended, Cancelled)
    )
}

/// Whether a client may move from `from` to `to`.
pub fn client_transition_allowed(from: ClientStatus, to: ClientStatus) -> bool {
    use ClientStatus::*;
    matches!(
        (from, to),
        (Prospect, Active)
            | (Active, Suspended)
            | (Active, Terminated)
            | (Suspended, Active)
            | (Suspended, Terminated)
    )
}

/// Validate an invoice status change against the transition table.
pub fn plan_invoice_transition(
    from: InvoiceStatus,
    to: InvoiceStatus,
    admin_override: bool,
) -> BillingResult<TransitionOutcome> {
    if from == to {
        return Ok(TransitionOutcome::Unchanged);
    }
    if admin_override || invoice_transition_allowed(from, to) {
        return Ok(TransitionOutcome::Changed);
    }
    Err(BillingError::IllegalInvoiceTransition { from, to })
}

/// Validate a contract status change against the transition table.
pub fn plan_contract_transition(
    from: ContractStatus,
    to: ContractStatus,
    admin_override: bool,
) -> BillingResult<TransitionOutcome> {
    if from == to {
        return Ok(TransitionOutcome::Unchanged);
    }
    if admin_override || contract_transition_allowed(from, to) {
        return Ok(TransitionOutcome::Changed);
    }
    Err(BillingError::IllegalContractTransition { from, to })
}

/// Validate a client status change against the transition table.
pub fn plan_client_transition(
    from: ClientStatus,
    to: ClientStatus,
    admin_override: bool,
) -> BillingResult<TransitionOutcome> {
    if from == to {
        return Ok(TransitionOutcome::Unchanged);
    }
    if admin_override || client_transition_allowed(from, to) {
        return Ok(TransitionOutcome::Changed);
    }
    Err(BillingError::IllegalClientTransition { from, to })
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkwave_shared::{ClientStatus::*, ContractStatus, InvoiceStatus::*};

    #[test]
    fn invoice_legal_edges() {
        assert!(invoice_transition_allowed(Pending, Paid));
        assert!(invoice_transition_allowed(Pending, Overdue));
        assert!(invoice_transition_allowed(Overdue, Paid));
    }

    #[test]
    fn invoice_paid_is_terminal() {
        assert!(!invoice_transition_allowed(Paid, Pending));
        assert!(!invoice_transition_allowed(Paid, Overdue));
        assert!(!invoice_transition_allowed(Overdue, Pending));
    }

    #[test]
    fn invoice_same_state_is_idempotent() {
        assert_eq!(
            plan_invoice_transition(Paid, Paid, false).unwrap(),
            TransitionOutcome::Unchanged
        );
        assert_eq!(
            plan_invoice_transition(Pending, Pending, false).unwrap(),
            TransitionOutcome::Unchanged
        );
    }

    #[test]
    fn invoice_illegal_edge_rejected_with_states() {
        let err = plan_invoice_transition(Paid, Pending, false).unwrap_err();
        match err {
            BillingError::IllegalInvoiceTransition { from, to } => {
                assert_eq!(from, Paid);
                assert_eq!(to, Pending);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invoice_override_bypasses_table() {
        assert_eq!(
            plan_invoice_transition(Paid, Pending, true).unwrap(),
            TransitionOutcome::Changed
        );
    }

    #[test]
    fn contract_suspension_is_reversible() {
        use ContractStatus::*;
        assert!(contract_transition_allowed(Active, Suspended));
        assert!(contract_transition_allowed(Suspended, Active));
        assert!(contract_transition_allowed(Suspended, Cancelled));
        assert!(!contract_transition_allowed(Cancelled, Active));
        assert!(!contract_transition_allowed(Cancelled, Pending));
    }

    #[test]
    fn contract_cannot_skip_pending_to_suspended() {
        use ContractStatus::*;
        assert!(!contract_transition_allowed(Pending, Suspended));
    }

    #[test]
    fn client_lifecycle_edges() {
        assert!(client_transition_allowed(Prospect, Active));
        assert!(client_transition_allowed(Active, Suspended));
        assert!(client_transition_allowed(Suspended, Active));
        assert!(client_transition_allowed(Suspended, Terminated));
        assert!(!client_transition_allowed(Terminated, Active));
        assert!(!client_transition_allowed(Prospect, Terminated));
        assert!(!client_transition_allowed(Prospect, Suspended));
    }

    #[test]
    fn client_terminated_needs_override() {
        assert!(plan_client_transition(Terminated, Active, false).is_err());
        assert_eq!(
            plan_client_transition(Terminated, Active, true).unwrap(),
            TransitionOutcome::Changed
        );
    }
}
