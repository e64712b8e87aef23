use crate::db::{StoreError, codec, now_timestamp};
use crate::domain::{ListingId, SearchId};
use crate::entities::{listings, prelude::*};
use crate::models::{Listing, NewListing, TechnicalDetails};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    Set, SqlErr,
};
use tracing::warn;

pub struct ListingRepository {
    conn: DatabaseConnection,
}

impl ListingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: listings::Model) -> Listing {
        let details = match model.details.as_deref() {
            None => TechnicalDetails::default(),
            Some(raw) => codec::decode_details(raw).unwrap_or_else(|e| {
                warn!(
                    event = "listing_details_unreadable",
                    listing_id = %model.id,
                    error = %e,
                    "Stored technical details could not be decoded"
                );
                TechnicalDetails::default()
            }),
        };

        Listing {
            id: ListingId::new(model.id),
            search_id: SearchId::new(model.search_id),
            title: model.title,
            price: model.price,
            price_number: model.price_number,
            location: model.location,
            link: model.link,
            image: model.image,
            seller: model.seller,
            timestamp: model.timestamp,
            badges: model.badges,
            description: model.description,
            details,
            first_seen: model.first_seen,
            last_seen: model.last_seen,
        }
    }

    pub async fn exists(&self, id: &ListingId) -> Result<bool, StoreError> {
        let count = Listings::find_by_id(id.as_str().to_owned())
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    /// Inserts a never-seen listing. A second insert of the same id is
    /// reported as [`StoreError::DuplicateListing`].
    pub async fn insert(&self, listing: &NewListing, search_id: SearchId) -> Result<(), StoreError> {
        let summary = &listing.summary;
        let details = listing
            .details
            .as_ref()
            .map(codec::encode_details)
            .transpose()?;
        let now = now_timestamp();

        let active = listings::ActiveModel {
            id: Set(summary.id.as_str().to_owned()),
            search_id: Set(search_id.value()),
            title: Set(summary.title.clone()),
            price: Set(summary.price.clone()),
            price_number: Set(summary.price_number),
            location: Set(summary.location.clone()),
            link: Set(summary.link.clone()),
            image: Set(summary.image.clone()),
            seller: Set(summary.seller.clone()),
            timestamp: Set(summary.timestamp.clone()),
            badges: Set(summary.badges.clone()),
            description: Set(listing.description.clone()),
            details: Set(details),
            first_seen: Set(now.clone()),
            last_seen: Set(now),
        };

        match Listings::insert(active)
            .exec_without_returning(&self.conn)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(StoreError::DuplicateListing(summary.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get(&self, id: &ListingId) -> Result<Option<Listing>, StoreError> {
        let row = Listings::find_by_id(id.as_str().to_owned())
            .one(&self.conn)
            .await?;
        Ok(row.map(Self::map_model))
    }

    /// Newest first. Rows sharing a `first_seen` fall back to insertion order.
    pub async fn for_search(&self, search_id: SearchId) -> Result<Vec<Listing>, StoreError> {
        let rows = Listings::find()
            .filter(listings::Column::SearchId.eq(search_id.value()))
            .order_by_desc(listings::Column::FirstSeen)
            .order_by(Expr::cust("rowid"), Order::Desc)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn count_for_search(&self, search_id: SearchId) -> Result<u64, StoreError> {
        let count = Listings::find()
            .filter(listings::Column::SearchId.eq(search_id.value()))
            .count(&self.conn)
            .await?;
        Ok(count)
    }
}
