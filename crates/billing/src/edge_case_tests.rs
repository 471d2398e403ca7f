// Test file - these are expected patterns in test code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Edge Case Tests for the Billing Core
//!
//! Boundary conditions in:
//! - Debt derivation and status mapping
//! - Settlement arithmetic
//! - Transition tables under override and terminal states

#[cfg(test)]
mod debt_tests {
    use crate::aggregate::{derive_status, BillingStatus};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    // =========================================================================
    // Exactly zero debt - CURRENT, not DEBTOR
    // =========================================================================
    #[test]
    fn zero_debt_is_current() {
        assert_eq!(derive_status(Decimal::ZERO), BillingStatus::Current);
    }

    // =========================================================================
    // Smallest representable positive debt - already DEBTOR
    // =========================================================================
    #[test]
    fn one_cent_of_debt_is_debtor() {
        assert_eq!(derive_status(dec!(0.01)), BillingStatus::Debtor);
    }

    // =========================================================================
    // Decimal comparison is exact, no float epsilon effects
    // =========================================================================
    #[test]
    fn debt_comparison_is_exact() {
        let debt = dec!(0.10) + dec!(0.20) - dec!(0.30);
        assert_eq!(debt, Decimal::ZERO);
        assert_eq!(derive_status(debt), BillingStatus::Current);
    }
}

#[cfg(test)]
mod settlement_tests {
    use crate::settlement::is_settled;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    // =========================================================================
    // Payment exactly equal to the amount settles the invoice
    // =========================================================================
    #[test]
    fn exact_cover_settles() {
        assert!(is_settled(dec!(100.00), dec!(100.00)));
    }

    // =========================================================================
    // One cent short does not settle
    // =========================================================================
    #[test]
    fn one_cent_short_does_not_settle() {
        assert!(!is_settled(dec!(99.99), dec!(100.00)));
    }

    // =========================================================================
    // Many small payments accumulate to a settlement
    // =========================================================================
    #[test]
    fn micro_payments_accumulate() {
        let amount = dec!(1.00);
        let mut paid = Decimal::ZERO;
        for _ in 0..99 {
            paid += dec!(0.01);
            assert!(!is_settled(paid, amount));
        }
        paid += dec!(0.01);
        assert!(is_settled(paid, amount));
    }

    // =========================================================================
    // Overpayment still reads as settled
    // =========================================================================
    #[test]
    fn overpayment_is_settled() {
        assert!(is_settled(dec!(150.00), dec!(100.00)));
    }
}

#[cfg(test)]
mod transition_tests {
    use crate::error::BillingError;
    use crate::transitions::*;
    use linkwave_shared::{ClientStatus, ContractStatus, InvoiceStatus};

    // =========================================================================
    // Full invoice matrix: only three edges legal
    // =========================================================================
    #[test]
    fn invoice_matrix_is_exact() {
        use InvoiceStatus::*;
        let all = [Pending, Paid, Overdue];
        let mut legal = Vec::new();
        for from in all {
            for to in all {
                if from != to && invoice_transition_allowed(from, to) {
                    legal.push((from, to));
                }
            }
        }
        assert_eq!(
            legal,
            vec![(Pending, Paid), (Pending, Overdue), (Overdue, Paid)]
        );
    }

    // =========================================================================
    // Full contract matrix: six edges, cancelled absorbing
    // =========================================================================
    #[test]
    fn contract_matrix_is_exact() {
        use ContractStatus::*;
        let all = [Pending, Active, Suspended, Cancelled];
        let legal: Vec<_> = all
            .iter()
            .flat_map(|&from| {
                all.iter()
                    .filter(move |&&to| from != to && contract_transition_allowed(from, to))
                    .map(move |&to| (from, to))
            })
            .collect();
        assert_eq!(legal.len(), 6);
        assert!(legal.iter().all(|&(from, _)| from != Cancelled));
    }

    // =========================================================================
    // Full client matrix: five edges, terminated absorbing
    // =========================================================================
    #[test]
    fn client_matrix_is_exact() {
        use ClientStatus::*;
        let all = [Prospect, Active, Suspended, Terminated];
        let legal: Vec<_> = all
            .iter()
            .flat_map(|&from| {
                all.iter()
                    .filter(move |&&to| from != to && client_transition_allowed(from, to))
                    .map(move |&to| (from, to))
            })
            .collect();
        assert_eq!(legal.len(), 5);
        assert!(legal.iter().all(|&(from, _)| from != Terminated));
        // A prospect can only be activated, never suspended or terminated.
        assert!(legal
            .iter()
            .filter(|&&(from, _)| from == Prospect)
            .all(|&(_, to)| to == Active));
    }

    // =========================================================================
    // Marking an already-PAID invoice PAID again is a no-op success
    // =========================================================================
    #[test]
    fn repay_paid_invoice_is_noop() {
        let outcome =
            plan_invoice_transition(InvoiceStatus::Paid, InvoiceStatus::Paid, false).unwrap();
        assert_eq!(outcome, TransitionOutcome::Unchanged);
    }

    // =========================================================================
    // Override bypasses every illegal edge but never errors on legal ones
    // =========================================================================
    #[test]
    fn override_accepts_everything() {
        use InvoiceStatus::*;
        for from in [Pending, Paid, Overdue] {
            for to in [Pending, Paid, Overdue] {
                assert!(plan_invoice_transition(from, to, true).is_ok());
            }
        }
    }

    // =========================================================================
    // Illegal transition errors carry both endpoints
    // =========================================================================
    #[test]
    fn illegal_contract_error_names_states() {
        let err = plan_contract_transition(
            ContractStatus::Cancelled,
            ContractStatus::Active,
            false,
        )
        .unwrap_err();
        match err {
            BillingError::IllegalContractTransition { from, to } => {
                assert_eq!(from, ContractStatus::Cancelled);
                assert_eq!(to, ContractStatus::Active);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
