use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_reference_tables::Migration),
            Box::new(m20240601_000002_create_stock_tables::Migration),
            Box::new(m20240601_000003_create_procurement_tables::Migration),
            Box::new(m20240601_000004_create_dispensing_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240601_000001_create_reference_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Facilities::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Facilities::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Facilities::Name).string().not_null())
                        .col(ColumnDef::new(Facilities::Location).string().null())
                        .col(
                            ColumnDef::new(Facilities::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Suppliers::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Suppliers::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Suppliers::ContactPerson).string().null())
                        .col(ColumnDef::new(Suppliers::Phone).string().null())
                        .col(ColumnDef::new(Suppliers::Email).string().null())
                        .col(
                            ColumnDef::new(Suppliers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Suppliers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Patients::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Patients::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Patients::FirstName).string().not_null())
                        .col(ColumnDef::new(Patients::LastName).string().not_null())
                        .col(ColumnDef::new(Patients::FacilityId).integer().null())
                        .col(
                            ColumnDef::new(Patients::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_patients_facility_id")
                                .from(Patients::Table, Patients::FacilityId)
                                .to(Facilities::Table, Facilities::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PatientVisits::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PatientVisits::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PatientVisits::PatientId).integer().not_null())
                        .col(ColumnDef::new(PatientVisits::FacilityId).integer().null())
                        .col(
                            ColumnDef::new(PatientVisits::VisitDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_patient_visits_patient_id")
                                .from(PatientVisits::Table, PatientVisits::PatientId)
                                .to(Patients::Table, Patients::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_patient_visits_facility_id")
                                .from(PatientVisits::Table, PatientVisits::FacilityId)
                                .to(Facilities::Table, Facilities::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PatientVisits::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Patients::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Facilities::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Facilities {
        Table,
        Id,
        Name,
        Location,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Suppliers {
        Table,
        Id,
        Name,
        ContactPerson,
        Phone,
        Email,
        IsActive,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Patients {
        Table,
        Id,
        FirstName,
        LastName,
        FacilityId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PatientVisits {
        Table,
        Id,
        PatientId,
        FacilityId,
        VisitDate,
    }
}

mod m20240601_000002_create_stock_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_stock_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(StockItems::Name).string().not_null())
                        .col(ColumnDef::new(StockItems::Description).text().null())
                        .col(
                            ColumnDef::new(StockItems::CurrentStock)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockItems::Unit).string_len(16).not_null())
                        .col(ColumnDef::new(StockItems::PurchasePrice).decimal_len(16, 4).null())
                        .col(ColumnDef::new(StockItems::SalePrice).decimal_len(16, 4).null())
                        .col(
                            ColumnDef::new(StockItems::ReorderLevel)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockItems::ExpiryDate).date().null())
                        .col(ColumnDef::new(StockItems::SupplierId).integer().null())
                        .col(ColumnDef::new(StockItems::Location).string().null())
                        .col(
                            ColumnDef::new(StockItems::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(StockItems::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(StockItems::CreatedBy).uuid().null())
                        .col(ColumnDef::new(StockItems::UpdatedBy).uuid().null())
                        .col(
                            ColumnDef::new(StockItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_items_supplier_id")
                                .from(StockItems::Table, StockItems::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_stock_items_name_supplier")
                        .table(StockItems::Table)
                        .col(StockItems::Name)
                        .col(StockItems::SupplierId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_items_expiry_date")
                        .table(StockItems::Table)
                        .col(StockItems::ExpiryDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SupplierStockItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SupplierStockItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(SupplierStockItems::SupplierId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierStockItems::StockItemId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierStockItems::SuppliedPrice)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierStockItems::LastSuppliedDate)
                                .date()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_supplier_stock_items_supplier_id")
                                .from(SupplierStockItems::Table, SupplierStockItems::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_supplier_stock_items_stock_item_id")
                                .from(SupplierStockItems::Table, SupplierStockItems::StockItemId)
                                .to(StockItems::Table, StockItems::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_supplier_stock_items_pair")
                        .table(SupplierStockItems::Table)
                        .col(SupplierStockItems::SupplierId)
                        .col(SupplierStockItems::StockItemId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Medications::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Medications::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Medications::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Medications::Description).text().null())
                        .col(
                            ColumnDef::new(Medications::StockItemId)
                                .integer()
                                .null()
                                .unique_key(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_medications_stock_item_id")
                                .from(Medications::Table, Medications::StockItemId)
                                .to(StockItems::Table, StockItems::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InventoryHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryHistory::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(InventoryHistory::StockItemId).integer().null())
                        .col(
                            ColumnDef::new(InventoryHistory::TransactionType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryHistory::QuantityChange)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryHistory::NewStockLevel)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(InventoryHistory::Reason).text().not_null())
                        .col(ColumnDef::new(InventoryHistory::ProcessedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(InventoryHistory::Timestamp)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_inventory_history_stock_item_id")
                                .from(InventoryHistory::Table, InventoryHistory::StockItemId)
                                .to(StockItems::Table, StockItems::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_history_item_timestamp")
                        .table(InventoryHistory::Table)
                        .col(InventoryHistory::StockItemId)
                        .col(InventoryHistory::Timestamp)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Medications::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SupplierStockItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockItems {
        Table,
        Id,
        Name,
        Description,
        CurrentStock,
        Unit,
        PurchasePrice,
        SalePrice,
        ReorderLevel,
        ExpiryDate,
        SupplierId,
        Location,
        IsActive,
        Version,
        CreatedBy,
        UpdatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum SupplierStockItems {
        Table,
        Id,
        SupplierId,
        StockItemId,
        SuppliedPrice,
        LastSuppliedDate,
    }

    #[derive(DeriveIden)]
    enum Medications {
        Table,
        Id,
        Name,
        Description,
        StockItemId,
    }

    #[derive(DeriveIden)]
    enum InventoryHistory {
        Table,
        Id,
        StockItemId,
        TransactionType,
        QuantityChange,
        NewStockLevel,
        Reason,
        ProcessedBy,
        Timestamp,
    }

    #[derive(DeriveIden)]
    enum Suppliers {
        Table,
        Id,
    }
}

mod m20240601_000003_create_procurement_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_procurement_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Orders::SupplierId).integer().not_null())
                        .col(ColumnDef::new(Orders::FacilityId).integer().not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(ColumnDef::new(Orders::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_supplier_id")
                                .from(Orders::Table, Orders::SupplierId)
                                .to(Suppliers::Table, Suppliers::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_facility_id")
                                .from(Orders::Table, Orders::FacilityId)
                                .to(Facilities::Table, Facilities::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
                        .col(ColumnDef::new(OrderItems::StockItemId).integer().null())
                        .col(
                            ColumnDef::new(OrderItems::Quantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::UnitPrice)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_stock_item_id")
                                .from(OrderItems::Table, OrderItems::StockItemId)
                                .to(StockItems::Table, StockItems::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_order_items_order_stock_item")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .col(OrderItems::StockItemId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderHistory::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderHistory::OrderId).integer().null())
                        .col(ColumnDef::new(OrderHistory::ChangeType).string().not_null())
                        .col(ColumnDef::new(OrderHistory::Description).text().not_null())
                        .col(ColumnDef::new(OrderHistory::ChangedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(OrderHistory::Timestamp)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_history_order_id")
                                .from(OrderHistory::Table, OrderHistory::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_history_order_id")
                        .table(OrderHistory::Table)
                        .col(OrderHistory::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        SupplierId,
        FacilityId,
        Status,
        TotalAmount,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        StockItemId,
        Quantity,
        UnitPrice,
    }

    #[derive(DeriveIden)]
    enum OrderHistory {
        Table,
        Id,
        OrderId,
        ChangeType,
        Description,
        ChangedBy,
        Timestamp,
    }

    #[derive(DeriveIden)]
    enum Suppliers {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Facilities {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum StockItems {
        Table,
        Id,
    }
}

mod m20240601_000004_create_dispensing_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_dispensing_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Prescriptions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Prescriptions::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Prescriptions::PatientVisitId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Prescriptions::MedicationId).integer().not_null())
                        .col(ColumnDef::new(Prescriptions::Dosage).string().not_null())
                        .col(ColumnDef::new(Prescriptions::Frequency).string().not_null())
                        .col(ColumnDef::new(Prescriptions::DurationDays).integer().null())
                        .col(
                            ColumnDef::new(Prescriptions::QuantityPrescribed)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Prescriptions::QuantityDispensed)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Prescriptions::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Prescriptions::PrescribedBy).uuid().null())
                        .col(ColumnDef::new(Prescriptions::DispensedBy).uuid().null())
                        .col(
                            ColumnDef::new(Prescriptions::DispensedDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Prescriptions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Prescriptions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_prescriptions_patient_visit_id")
                                .from(Prescriptions::Table, Prescriptions::PatientVisitId)
                                .to(PatientVisits::Table, PatientVisits::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_prescriptions_medication_id")
                                .from(Prescriptions::Table, Prescriptions::MedicationId)
                                .to(Medications::Table, Medications::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PaymentTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentTransactions::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::PatientId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::PrescriptionId)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::Amount)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::PaymentMethod)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::AmountCoveredByInsurance)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::PatientPaidAmount)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::InsurancePolicyNumber)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::ProcessedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PaymentTransactions::TransactionDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payment_transactions_patient_id")
                                .from(PaymentTransactions::Table, PaymentTransactions::PatientId)
                                .to(Patients::Table, Patients::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payment_transactions_prescription_id")
                                .from(
                                    PaymentTransactions::Table,
                                    PaymentTransactions::PrescriptionId,
                                )
                                .to(Prescriptions::Table, Prescriptions::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payment_transactions_method_date")
                        .table(PaymentTransactions::Table)
                        .col(PaymentTransactions::PaymentMethod)
                        .col(PaymentTransactions::TransactionDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PaymentTransactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Prescriptions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Prescriptions {
        Table,
        Id,
        PatientVisitId,
        MedicationId,
        Dosage,
        Frequency,
        DurationDays,
        QuantityPrescribed,
        QuantityDispensed,
        Status,
        PrescribedBy,
        DispensedBy,
        DispensedDate,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PaymentTransactions {
        Table,
        Id,
        PatientId,
        PrescriptionId,
        Amount,
        PaymentMethod,
        AmountCoveredByInsurance,
        PatientPaidAmount,
        InsurancePolicyNumber,
        ProcessedBy,
        TransactionDate,
    }

    #[derive(DeriveIden)]
    enum PatientVisits {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Patients {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Medications {
        Table,
        Id,
    }
}
