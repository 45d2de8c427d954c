//! 追踪表迁移
//!
//! campaign_targets 保存每个收件人的追踪 token，email_events 为只追加的交互日志。
//! 外键级联：删除活动 → 删除 campaign_targets → 删除 email_events。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CampaignTargets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CampaignTargets::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CampaignTargets::CampaignId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignTargets::TargetId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignTargets::UniqueToken)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CampaignTargets::ConsentGiven)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CampaignTargets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_campaign_targets_campaign")
                            .from(CampaignTargets::Table, CampaignTargets::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_campaign_targets_target")
                            .from(CampaignTargets::Table, CampaignTargets::TargetId)
                            .to(Targets::Table, Targets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_campaign_targets_campaign_id")
                    .table(CampaignTargets::Table)
                    .col(CampaignTargets::CampaignId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_campaign_targets_target_id")
                    .table(CampaignTargets::Table)
                    .col(CampaignTargets::TargetId)
                    .to_owned(),
            )
            .await?;

        // token 全局唯一
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_campaign_targets_unique_token")
                    .table(CampaignTargets::Table)
                    .col(CampaignTargets::UniqueToken)
                    .to_owned(),
            )
            .await?;

        // 同一活动中每个目标只能出现一次
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_campaign_targets_pair")
                    .table(CampaignTargets::Table)
                    .col(CampaignTargets::CampaignId)
                    .col(CampaignTargets::TargetId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EmailEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmailEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EmailEvents::CampaignTargetId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailEvents::EventType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmailEvents::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EmailEvents::IpAddress).string_len(45).null())
                    .col(ColumnDef::new(EmailEvents::UserAgent).text().null())
                    .col(ColumnDef::new(EmailEvents::Metadata).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_email_events_campaign_target")
                            .from(EmailEvents::Table, EmailEvents::CampaignTargetId)
                            .to(CampaignTargets::Table, CampaignTargets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_email_events_campaign_target_id")
                    .table(EmailEvents::Table)
                    .col(EmailEvents::CampaignTargetId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_email_events_timestamp")
                    .table(EmailEvents::Table)
                    .col(EmailEvents::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_email_events_event_type")
                    .table(EmailEvents::Table)
                    .col(EmailEvents::EventType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_email_events_event_type",
            "idx_email_events_timestamp",
            "idx_email_events_campaign_target_id",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }
        manager
            .drop_table(Table::drop().table(EmailEvents::Table).to_owned())
            .await?;

        for name in [
            "idx_campaign_targets_pair",
            "idx_campaign_targets_unique_token",
            "idx_campaign_targets_target_id",
            "idx_campaign_targets_campaign_id",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }
        manager
            .drop_table(Table::drop().table(CampaignTargets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Campaigns {
    #[sea_orm(iden = "campaigns")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Targets {
    #[sea_orm(iden = "targets")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum CampaignTargets {
    #[sea_orm(iden = "campaign_targets")]
    Table,
    Id,
    CampaignId,
    TargetId,
    UniqueToken,
    ConsentGiven,
    CreatedAt,
}

#[derive(DeriveIden)]
enum EmailEvents {
    #[sea_orm(iden = "email_events")]
    Table,
    Id,
    CampaignTargetId,
    EventType,
    Timestamp,
    IpAddress,
    UserAgent,
    Metadata,
}
