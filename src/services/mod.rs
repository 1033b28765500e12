// Stock and history
pub mod audit_trail;
pub mod reorder_advisor;
pub mod stock_ledger;

// Workflows
pub mod dispensing;
pub mod procurement;

// Reporting
pub mod reports;

use rust_decimal::Decimal;
use validator::ValidationError;

pub(crate) fn validate_positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("positive");
        err.message = Some("Must be greater than zero".into());
        Err(err)
    }
}

pub(crate) fn validate_non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Must not be negative".into());
        Err(err)
    }
}
