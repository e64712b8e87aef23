use crate::db::{StoreError, codec, now_timestamp};
use crate::domain::ListingId;
use crate::entities::{evaluations, prelude::*};
use crate::models::{Evaluation, RedFlags, StoredEvaluation};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Set};

pub struct EvaluationRepository {
    conn: DatabaseConnection,
}

impl EvaluationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: evaluations::Model) -> Result<StoredEvaluation, StoreError> {
        let red_flags = model
            .red_flags
            .as_deref()
            .map_or(RedFlags::None, RedFlags::from_text);

        Ok(StoredEvaluation {
            listing_id: ListingId::new(model.listing_id),
            evaluation: Evaluation {
                value_score: model.value_score,
                value_points: codec::decode_points(&model.value_points)?,
                match_score: model.match_score,
                match_points: codec::decode_points(&model.match_points)?,
                red_flags,
                raw_response: model.raw_response,
            },
            evaluated_at: model.evaluated_at,
        })
    }

    /// Writes the evaluation, replacing every field of an existing one.
    pub async fn upsert(
        &self,
        listing_id: &ListingId,
        evaluation: &Evaluation,
    ) -> Result<String, StoreError> {
        let evaluated_at = now_timestamp();

        let active = evaluations::ActiveModel {
            listing_id: Set(listing_id.as_str().to_owned()),
            value_score: Set(evaluation.value_score),
            value_points: Set(codec::encode_points(&evaluation.value_points)?),
            match_score: Set(evaluation.match_score),
            match_points: Set(codec::encode_points(&evaluation.match_points)?),
            red_flags: Set(Some(evaluation.red_flags.as_str().to_owned())),
            raw_response: Set(evaluation.raw_response.clone()),
            evaluated_at: Set(evaluated_at.clone()),
        };

        Evaluations::insert(active)
            .on_conflict(
                OnConflict::column(evaluations::Column::ListingId)
                    .update_columns([
                        evaluations::Column::ValueScore,
                        evaluations::Column::ValuePoints,
                        evaluations::Column::MatchScore,
                        evaluations::Column::MatchPoints,
                        evaluations::Column::RedFlags,
                        evaluations::Column::RawResponse,
                        evaluations::Column::EvaluatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(evaluated_at)
    }

    pub async fn get(&self, listing_id: &ListingId) -> Result<Option<StoredEvaluation>, StoreError> {
        Evaluations::find_by_id(listing_id.as_str().to_owned())
            .one(&self.conn)
            .await?
            .map(Self::map_model)
            .transpose()
    }

    pub async fn exists(&self, listing_id: &ListingId) -> Result<bool, StoreError> {
        let count = Evaluations::find_by_id(listing_id.as_str().to_owned())
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn delete(&self, listing_id: &ListingId) -> Result<bool, StoreError> {
        let result = Evaluations::delete_by_id(listing_id.as_str().to_owned())
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
