use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_catalog_tables::Migration),
            Box::new(m20250101_000002_create_orders_tables::Migration),
            Box::new(m20250101_000003_create_beo_tables::Migration),
            Box::new(m20250101_000004_create_notifications_table::Migration),
        ]
    }
}

mod m20250101_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Events::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Events::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Events::EventType)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Events::Code).string_len(4).not_null())
                        .col(
                            ColumnDef::new(Events::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Venues::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Venues::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Venues::Name).string().not_null())
                        .col(ColumnDef::new(Venues::Description).text().null())
                        .col(ColumnDef::new(Venues::CapacityBanquet).integer().null())
                        .col(ColumnDef::new(Venues::CapacityClassroom).integer().null())
                        .col(ColumnDef::new(Venues::CapacityTheater).integer().null())
                        .col(ColumnDef::new(Venues::CapacityReception).integer().null())
                        .col(ColumnDef::new(Venues::Photo).string().null())
                        .col(ColumnDef::new(Venues::FloorPlan).string().null())
                        .col(
                            ColumnDef::new(Venues::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Customers::Organizer).string().not_null())
                        .col(ColumnDef::new(Customers::ContactPerson).string().not_null())
                        .col(ColumnDef::new(Customers::Phone).string().not_null())
                        .col(ColumnDef::new(Customers::Email).string().not_null())
                        .col(ColumnDef::new(Customers::Address).text().null())
                        .col(
                            ColumnDef::new(Customers::KlStatus)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Departments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Departments::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Departments::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Departments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Packages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Packages::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Packages::DepartmentId).integer().not_null())
                        .col(
                            ColumnDef::new(Packages::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Packages::Description).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_packages_department")
                                .from(Packages::Table, Packages::DepartmentId)
                                .to(Departments::Table, Departments::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::DepartmentId).integer().null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_users_department")
                                .from(Users::Table, Users::DepartmentId)
                                .to(Departments::Table, Departments::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UserRoles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(UserRoles::UserId).integer().not_null())
                        .col(ColumnDef::new(UserRoles::Role).string_len(16).not_null())
                        .primary_key(
                            Index::create()
                                .col(UserRoles::UserId)
                                .col(UserRoles::Role),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_user_roles_user")
                                .from(UserRoles::Table, UserRoles::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_user_roles_role")
                        .table(UserRoles::Table)
                        .col(UserRoles::Role)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(UserRoles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Packages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Departments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Venues::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Events::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Events {
        Table,
        Id,
        EventType,
        Code,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Venues {
        Table,
        Id,
        Name,
        Description,
        CapacityBanquet,
        CapacityClassroom,
        CapacityTheater,
        CapacityReception,
        Photo,
        FloorPlan,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Customers {
        Table,
        Id,
        Organizer,
        ContactPerson,
        Phone,
        Email,
        Address,
        KlStatus,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Departments {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Packages {
        Table,
        Id,
        DepartmentId,
        Name,
        Description,
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Name,
        Email,
        DepartmentId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum UserRoles {
        Table,
        UserId,
        Role,
    }
}

mod m20250101_000002_create_orders_tables {
    use super::m20250101_000001_create_catalog_tables::{Customers, Events, Venues};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_orders_tables"
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
                        .col(
                            ColumnDef::new(Orders::CustomCode)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::EventId).integer().not_null())
                        .col(ColumnDef::new(Orders::EventName).string().not_null())
                        .col(ColumnDef::new(Orders::StartDate).date().not_null())
                        .col(ColumnDef::new(Orders::EndDate).date().not_null())
                        .col(
                            ColumnDef::new(Orders::Status)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::StatusBeo)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::CustomerId).integer().not_null())
                        .col(ColumnDef::new(Orders::Discount).double().null())
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(ColumnDef::new(Orders::CreatedBy).integer().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_event")
                                .from(Orders::Table, Orders::EventId)
                                .to(Events::Table, Events::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_customer")
                                .from(Orders::Table, Orders::CustomerId)
                                .to(Customers::Table, Customers::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // A soft-deleted order keeps its code, which may be handed out again
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS uq_orders_live_custom_code \
                     ON orders (custom_code) WHERE deleted_at IS NULL",
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_event_id")
                        .table(Orders::Table)
                        .col(Orders::EventId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_dates")
                        .table(Orders::Table)
                        .col(Orders::StartDate)
                        .col(Orders::EndDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderVenues::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderVenues::OrderId).integer().not_null())
                        .col(ColumnDef::new(OrderVenues::VenueId).integer().not_null())
                        .primary_key(
                            Index::create()
                                .col(OrderVenues::OrderId)
                                .col(OrderVenues::VenueId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_venues_order")
                                .from(OrderVenues::Table, OrderVenues::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_venues_venue")
                                .from(OrderVenues::Table, OrderVenues::VenueId)
                                .to(Venues::Table, Venues::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_venues_venue_id")
                        .table(OrderVenues::Table)
                        .col(OrderVenues::VenueId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Schedules::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Schedules::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Schedules::OrderId).integer().not_null())
                        .col(ColumnDef::new(Schedules::StartDate).date().not_null())
                        .col(ColumnDef::new(Schedules::EndDate).date().not_null())
                        .col(ColumnDef::new(Schedules::TimeStart).time().not_null())
                        .col(ColumnDef::new(Schedules::TimeEnd).time().not_null())
                        .col(ColumnDef::new(Schedules::Function).integer().not_null())
                        .col(
                            ColumnDef::new(Schedules::People)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_schedules_order")
                                .from(Schedules::Table, Schedules::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderAttachments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderAttachments::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(OrderAttachments::OrderId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderAttachments::Path).string().not_null())
                        .col(ColumnDef::new(OrderAttachments::OriginalName).string().null())
                        .col(
                            ColumnDef::new(OrderAttachments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_attachments_order")
                                .from(OrderAttachments::Table, OrderAttachments::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderAttachments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Schedules::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderVenues::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        CustomCode,
        EventId,
        EventName,
        StartDate,
        EndDate,
        Status,
        StatusBeo,
        CustomerId,
        Discount,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
        DeletedAt,
    }

    #[derive(DeriveIden)]
    enum OrderVenues {
        Table,
        OrderId,
        VenueId,
    }

    #[derive(DeriveIden)]
    enum Schedules {
        Table,
        Id,
        OrderId,
        StartDate,
        EndDate,
        TimeStart,
        TimeEnd,
        Function,
        People,
    }

    #[derive(DeriveIden)]
    enum OrderAttachments {
        Table,
        Id,
        OrderId,
        Path,
        OriginalName,
        CreatedAt,
    }
}

mod m20250101_000003_create_beo_tables {
    use super::m20250101_000001_create_catalog_tables::{Departments, Packages, Users};
    use super::m20250101_000002_create_orders_tables::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_beo_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Beos::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Beos::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Beos::OrderId).integer().not_null())
                        .col(ColumnDef::new(Beos::DepartmentId).integer().not_null())
                        .col(ColumnDef::new(Beos::UserId).integer().null())
                        .col(ColumnDef::new(Beos::PackageId).integer().null())
                        .col(ColumnDef::new(Beos::Notes).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_beos_order")
                                .from(Beos::Table, Beos::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_beos_department")
                                .from(Beos::Table, Beos::DepartmentId)
                                .to(Departments::Table, Departments::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_beos_user")
                                .from(Beos::Table, Beos::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_beos_package")
                                .from(Beos::Table, Beos::PackageId)
                                .to(Packages::Table, Packages::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BeoAttachments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BeoAttachments::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(BeoAttachments::BeoId).integer().not_null())
                        .col(ColumnDef::new(BeoAttachments::Path).string().not_null())
                        .col(ColumnDef::new(BeoAttachments::OriginalName).string().null())
                        .col(
                            ColumnDef::new(BeoAttachments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_beo_attachments_beo")
                                .from(BeoAttachments::Table, BeoAttachments::BeoId)
                                .to(Beos::Table, Beos::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BeoFiles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BeoFiles::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(BeoFiles::OrderId).integer().not_null())
                        .col(
                            ColumnDef::new(BeoFiles::FileCode)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(BeoFiles::Path).string().not_null())
                        .col(ColumnDef::new(BeoFiles::Size).big_integer().not_null())
                        .col(ColumnDef::new(BeoFiles::MimeType).string().not_null())
                        .col(ColumnDef::new(BeoFiles::Metadata).json().not_null())
                        .col(
                            ColumnDef::new(BeoFiles::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BeoFiles::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_beo_files_order")
                                .from(BeoFiles::Table, BeoFiles::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_beo_files_order_id")
                        .table(BeoFiles::Table)
                        .col(BeoFiles::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BeoFileSequences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BeoFileSequences::Period)
                                .string_len(7)
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(BeoFileSequences::LastValue)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BeoFileSequences::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BeoFiles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BeoAttachments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Beos::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Beos {
        Table,
        Id,
        OrderId,
        DepartmentId,
        UserId,
        PackageId,
        Notes,
    }

    #[derive(DeriveIden)]
    enum BeoAttachments {
        Table,
        Id,
        BeoId,
        Path,
        OriginalName,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum BeoFiles {
        Table,
        Id,
        OrderId,
        FileCode,
        Path,
        Size,
        MimeType,
        Metadata,
        CreatedAt,
        DeletedAt,
    }

    #[derive(DeriveIden)]
    enum BeoFileSequences {
        Table,
        Period,
        LastValue,
    }
}

mod m20250101_000004_create_notifications_table {
    use super::m20250101_000001_create_catalog_tables::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_notifications_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Notifications::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Notifications::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Notifications::UserId).integer().not_null())
                        .col(ColumnDef::new(Notifications::Kind).string().not_null())
                        .col(ColumnDef::new(Notifications::Data).json().not_null())
                        .col(
                            ColumnDef::new(Notifications::ReadAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Notifications::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_notifications_user")
                                .from(Notifications::Table, Notifications::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_notifications_user_id")
                        .table(Notifications::Table)
                        .col(Notifications::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Notifications::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Notifications {
        Table,
        Id,
        UserId,
        Kind,
        Data,
        ReadAt,
        CreatedAt,
    }
}
