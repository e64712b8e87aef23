use crate::db::{StoreError, now_timestamp};
use crate::domain::SearchId;
use crate::entities::{prelude::*, searches};
use crate::models::Search;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use tracing::debug;

pub struct SearchRepository {
    conn: DatabaseConnection,
}

impl SearchRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: searches::Model) -> Search {
        Search {
            id: SearchId::new(model.id),
            query: model.query,
            first_seen: model.first_seen,
            last_run: model.last_run,
            run_count: model.run_count,
        }
    }

    async fn bump<C: ConnectionTrait>(conn: &C, query: &str, now: &str) -> Result<u64, DbErr> {
        let result = Searches::update_many()
            .col_expr(
                searches::Column::RunCount,
                Expr::col(searches::Column::RunCount).add(1),
            )
            .col_expr(searches::Column::LastRun, Expr::value(now))
            .filter(searches::Column::Query.eq(query))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    /// Update-then-insert inside one transaction. A concurrent insert of the
    /// same query loses the `ON CONFLICT` race and falls back to another bump.
    pub async fn upsert(&self, query: &str) -> Result<SearchId, StoreError> {
        let txn = self.conn.begin().await?;
        let now = now_timestamp();

        if Self::bump(&txn, query, &now).await? == 0 {
            let active = searches::ActiveModel {
                query: Set(query.to_string()),
                first_seen: Set(now.clone()),
                last_run: Set(now.clone()),
                run_count: Set(1),
                ..Default::default()
            };

            let inserted = Searches::insert(active)
                .on_conflict(
                    OnConflict::column(searches::Column::Query)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;

            if inserted == 0 {
                Self::bump(&txn, query, &now).await?;
            } else {
                debug!(event = "search_created", query = %query, "Recorded new search");
            }
        }

        let row = Searches::find()
            .filter(searches::Column::Query.eq(query))
            .one(&txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("search {query}")))?;

        txn.commit().await?;
        Ok(SearchId::new(row.id))
    }

    pub async fn find_by_query(&self, query: &str) -> Result<Option<Search>, StoreError> {
        let row = Searches::find()
            .filter(searches::Column::Query.eq(query))
            .one(&self.conn)
            .await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn get(&self, id: SearchId) -> Result<Option<Search>, StoreError> {
        let row = Searches::find_by_id(id.value()).one(&self.conn).await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn list_recent(&self) -> Result<Vec<Search>, StoreError> {
        let rows = Searches::find()
            .order_by_desc(searches::Column::LastRun)
            .order_by_asc(searches::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }
}
