/*!
 * Role-based access policy.
 *
 * The table is the whole policy: an operation is permitted exactly when the
 * actor's role is listed for it.
 */

use super::{Principal, Role};
use crate::errors::ServiceError;
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use strum::{EnumIter, IntoEnumIterator};
use tracing::warn;

/// Guarded operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, strum::Display)]
pub enum Operation {
    PlaceOrder,
    ManageOrders,
    ViewOrders,
    Dispense,
    ManageStock,
    ViewStock,
    ViewStockHistory,
    ViewReorderSuggestions,
    StockLevelReport,
    ExpiringReport,
    UsageReport,
    InsuranceReport,
}

lazy_static! {
    static ref POLICY: HashMap<Operation, HashSet<Role>> = {
        use Operation::*;
        use Role::*;

        let pharmacy = [SuperAdmin, FacilityAdmin, Pharmacist];
        let mut policy = HashMap::new();

        for op in [
            PlaceOrder,
            ManageOrders,
            ViewOrders,
            ManageStock,
            ViewStockHistory,
            ViewReorderSuggestions,
            StockLevelReport,
            ExpiringReport,
        ] {
            policy.insert(op, pharmacy.into_iter().collect::<HashSet<_>>());
        }

        policy.insert(Dispense, pharmacy.into_iter().chain([Nurse]).collect());
        policy.insert(InsuranceReport, pharmacy.into_iter().chain([Nurse]).collect());
        policy.insert(UsageReport, pharmacy.into_iter().chain([Doctor]).collect());
        policy.insert(ViewStock, Role::iter().collect());

        policy
    };
}

/// Whether `actor` may perform `operation`
pub fn allowed(actor: &Principal, operation: Operation) -> bool {
    POLICY
        .get(&operation)
        .map(|roles| roles.contains(&actor.role))
        .unwrap_or(false)
}

/// Like [`allowed`], failing with `Forbidden` on denial
pub fn authorize(actor: &Principal, operation: Operation) -> Result<(), ServiceError> {
    if allowed(actor, operation) {
        Ok(())
    } else {
        warn!(actor = %actor.actor_id, role = %actor.role, %operation, "Access denied");
        Err(ServiceError::Forbidden(format!(
            "Role {} may not perform {}",
            actor.role, operation
        )))
    }
}

/// Every operation has an entry; used by the startup self-check.
pub fn covers_all_operations() -> bool {
    Operation::iter().all(|op| POLICY.contains_key(&op))
}

#[cfg(test)]
mod tests {
    use super::Operation::*;
    use super::*;
    use rstest::rstest;
    use uuid::Uuid;

    fn actor(role: Role) -> Principal {
        Principal::new(Uuid::new_v4(), role)
    }

    #[rstest]
    #[case(Role::Pharmacist, PlaceOrder, true)]
    #[case(Role::FacilityAdmin, ManageOrders, true)]
    #[case(Role::Nurse, PlaceOrder, false)]
    #[case(Role::Doctor, ViewOrders, false)]
    #[case(Role::Nurse, Dispense, true)]
    #[case(Role::Doctor, Dispense, false)]
    #[case(Role::Pharmacist, ManageStock, true)]
    #[case(Role::Nurse, ManageStock, false)]
    #[case(Role::Doctor, ViewStock, true)]
    #[case(Role::Nurse, ViewStock, true)]
    #[case(Role::Nurse, ViewStockHistory, false)]
    #[case(Role::Doctor, ViewReorderSuggestions, false)]
    #[case(Role::SuperAdmin, StockLevelReport, true)]
    #[case(Role::Nurse, ExpiringReport, false)]
    #[case(Role::Doctor, UsageReport, true)]
    #[case(Role::Nurse, UsageReport, false)]
    #[case(Role::Nurse, InsuranceReport, true)]
    #[case(Role::Doctor, InsuranceReport, false)]
    fn policy_table(#[case] role: Role, #[case] op: Operation, #[case] expected: bool) {
        assert_eq!(allowed(&actor(role), op), expected);
    }

    #[test]
    fn super_admin_may_do_everything() {
        let admin = actor(Role::SuperAdmin);
        assert!(Operation::iter().all(|op| allowed(&admin, op)));
        assert!(covers_all_operations());
    }

    #[test]
    fn denial_is_forbidden() {
        let err = authorize(&actor(Role::Doctor), Dispense).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
