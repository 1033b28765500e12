use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A medication prescribed during a visit.
///
/// `quantity_dispensed` never exceeds `quantity_prescribed`; `status` follows
/// from the two (`Completed` exactly when they are equal).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "prescriptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub patient_visit_id: i32,
    pub medication_id: i32,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: Option<i32>,
    pub quantity_prescribed: i32,
    pub quantity_dispensed: i32,
    pub status: PrescriptionStatus,
    pub prescribed_by: Option<Uuid>,
    pub dispensed_by: Option<Uuid>,
    pub dispensed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn remaining_quantity(&self) -> i32 {
        self.quantity_prescribed - self.quantity_dispensed
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::patient_visit::Entity",
        from = "Column::PatientVisitId",
        to = "super::patient_visit::Column::Id",
        on_delete = "Cascade"
    )]
    PatientVisit,
    #[sea_orm(
        belongs_to = "super::medication::Entity",
        from = "Column::MedicationId",
        to = "super::medication::Column::Id",
        on_delete = "Restrict"
    )]
    Medication,
}

impl Related<super::patient_visit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PatientVisit.def()
    }
}

impl Related<super::medication::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Medication.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PrescriptionStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Partially Dispensed")]
    #[serde(rename = "Partially Dispensed")]
    #[strum(serialize = "Partially Dispensed")]
    PartiallyDispensed,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl PrescriptionStatus {
    /// Statuses from which no further quantity may be dispensed
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}
