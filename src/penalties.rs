//! Penalty lifecycle: `pending → confirmed`, nothing else.
//!
//! A penalty is recorded against a participant by a peer and only counts
//! toward the participant's `totalPenalty` once the participant confirms it.
//! Confirmation is a single optimistic transaction over the participant and
//! penalty documents, so concurrent confirms of one penalty increment the
//! total exactly once; confirming an already-confirmed penalty is a no-op
//! success.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        require_segment, AddPenaltyPayload, ConfirmPenaltyPayload, Participant, PenaltiesQuery,
        Penalty, PenaltyStatus,
    },
    store::{paths, Store, Tx, WriteSet},
};

/// Records a pending penalty. The participant's total is not touched until
/// the penalty is confirmed.
pub async fn add(store: &Store, payload: AddPenaltyPayload) -> Result<(), AppError> {
    const MSG: &str = "missing required parameters";
    let competition_id = require_segment(payload.competition_id, MSG)?;
    let penalized_user = require_segment(payload.penalized_user, MSG)?;
    let penalizing_user = require_segment(payload.penalizing_user, MSG)?;
    // reason must be present but may be empty
    let reason = payload.reason.ok_or(AppError::Validation(MSG))?;
    let amount = match payload.amount {
        None => return Err(AppError::Validation(MSG)),
        Some(amount) if amount >= 1 => amount as u64,
        Some(_) => return Err(AppError::Validation("amount must be a positive integer")),
    };

    let participant_path = paths::participant(&competition_id, &penalized_user);
    let penalty = Penalty {
        id: Uuid::new_v4().to_string(),
        competition_id: competition_id.clone(),
        penalizing_user,
        reason,
        amount,
        status: PenaltyStatus::Pending,
        timestamp: Utc::now(),
    };
    let penalty_path = paths::penalty(&competition_id, &penalized_user, &penalty.id);

    store
        .transact(&[participant_path.clone()], |tx| {
            if tx.get(&participant_path).is_none() {
                return Err(AppError::NotFound(
                    "penalized user is not in this competition",
                ));
            }

            let mut writes = WriteSet::new();
            writes.put(penalty_path.clone(), &penalty)?;
            Ok(Tx::Commit(writes, ()))
        })
        .await?;

    info!(
        "penalty {} of {} recorded against {penalized_user}",
        penalty.id, penalty.amount
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    AlreadyConfirmed,
}

/// Confirms a pending penalty, adding its stored amount to the participant's
/// total. The wire payload carries an `amount` field for compatibility with
/// the original client; its value is ignored in favor of the stored one.
pub async fn confirm(
    store: &Store,
    payload: ConfirmPenaltyPayload,
) -> Result<ConfirmOutcome, AppError> {
    const MSG: &str = "missing required fields";
    let competition_id = require_segment(payload.competition_id, MSG)?;
    let penalized_user = require_segment(payload.penalized_user, MSG)?;
    let penalty_id = require_segment(payload.penalty_id, MSG)?;
    if payload.amount.is_none() {
        return Err(AppError::Validation(MSG));
    }

    let participant_path = paths::participant(&competition_id, &penalized_user);
    let penalty_path = paths::penalty(&competition_id, &penalized_user, &penalty_id);

    let outcome = store
        .transact(&[participant_path.clone(), penalty_path.clone()], |tx| {
            let Some(mut participant) = tx.deserialize::<Participant>(&participant_path)? else {
                return Err(AppError::NotFound(
                    "penalized user is not in this competition",
                ));
            };
            let Some(mut penalty) = tx.deserialize::<Penalty>(&penalty_path)? else {
                return Err(AppError::NotFound("penalty not found"));
            };

            if penalty.status == PenaltyStatus::Confirmed {
                return Ok(Tx::ReadOnly(ConfirmOutcome::AlreadyConfirmed));
            }

            participant.total_penalty += penalty.amount;
            penalty.status = PenaltyStatus::Confirmed;

            let mut writes = WriteSet::new();
            writes.put(participant_path.clone(), &participant)?;
            writes.put(penalty_path.clone(), &penalty)?;
            Ok(Tx::Commit(writes, ConfirmOutcome::Confirmed))
        })
        .await?;

    match outcome {
        ConfirmOutcome::Confirmed => info!("penalty {penalty_id} confirmed by {penalized_user}"),
        ConfirmOutcome::AlreadyConfirmed => info!("penalty {penalty_id} was already confirmed"),
    }
    Ok(outcome)
}

/// All penalties of a participant, optionally filtered by status, oldest
/// first. A pure read; unknown participants yield an empty list.
pub async fn list(store: &Store, query: PenaltiesQuery) -> Result<Vec<Penalty>, AppError> {
    const MSG: &str = "competition id and user name are required";
    let competition_id = require_segment(query.competition_id, MSG)?;
    let user_name = require_segment(query.user_name, MSG)?;

    let status = query
        .status
        .as_deref()
        .map(|s| {
            PenaltyStatus::parse(s)
                .ok_or(AppError::Validation("status must be 'pending' or 'confirmed'"))
        })
        .transpose()?;
    let filter = status.map(|s| ("status", s.as_str()));

    let mut penalties: Vec<Penalty> = store
        .scan(&paths::penalties(&competition_id, &user_name), filter)
        .await?;
    penalties.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    Ok(penalties)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        competitions,
        models::{CreateCompetitionPayload, JoinCompetitionPayload},
    };

    async fn gym_with_bob(store: &Store) -> String {
        let id = competitions::create(
            store,
            CreateCompetitionPayload {
                name: Some("Gym".to_string()),
                passphrase: Some("abcd1234".to_string()),
                user_name: Some("alice".to_string()),
            },
        )
        .await
        .unwrap();
        competitions::join(
            store,
            JoinCompetitionPayload {
                passphrase: Some("abcd1234".to_string()),
                user_name: Some("bob".to_string()),
            },
        )
        .await
        .unwrap();
        id
    }

    fn add_payload(id: &str, amount: i64, reason: &str) -> AddPenaltyPayload {
        AddPenaltyPayload {
            competition_id: Some(id.to_string()),
            penalized_user: Some("bob".to_string()),
            penalizing_user: Some("alice".to_string()),
            reason: Some(reason.to_string()),
            amount: Some(amount),
        }
    }

    fn confirm_payload(id: &str, penalty_id: &str, amount: i64) -> ConfirmPenaltyPayload {
        ConfirmPenaltyPayload {
            competition_id: Some(id.to_string()),
            penalized_user: Some("bob".to_string()),
            penalty_id: Some(penalty_id.to_string()),
            amount: Some(amount),
        }
    }

    fn bobs_penalties(id: &str) -> PenaltiesQuery {
        PenaltiesQuery {
            competition_id: Some(id.to_string()),
            user_name: Some("bob".to_string()),
            status: None,
        }
    }

    async fn bobs_total(store: &Store, id: &str) -> u64 {
        let details = competitions::details(store, Some(id.to_string()))
            .await
            .unwrap();
        details
            .users
            .iter()
            .find(|p| p.name == "bob")
            .unwrap()
            .total_penalty
    }

    #[tokio::test]
    async fn add_leaves_the_total_untouched() {
        let store = Store::memory();
        let id = gym_with_bob(&store).await;

        add(&store, add_payload(&id, 10, "late")).await.unwrap();

        let penalties = list(&store, bobs_penalties(&id)).await.unwrap();
        assert_eq!(penalties.len(), 1);
        assert_eq!(penalties[0].status, PenaltyStatus::Pending);
        assert_eq!(penalties[0].amount, 10);
        assert_eq!(penalties[0].penalizing_user, "alice");
        assert_eq!(bobs_total(&store, &id).await, 0);
    }

    #[tokio::test]
    async fn add_against_unknown_participant_is_not_found() {
        let store = Store::memory();
        let id = gym_with_bob(&store).await;

        let mut payload = add_payload(&id, 10, "late");
        payload.penalized_user = Some("mallory".to_string());
        let err = add(&store, payload).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn add_rejects_missing_and_non_positive_amounts() {
        let store = Store::memory();
        let id = gym_with_bob(&store).await;

        let mut payload = add_payload(&id, 10, "late");
        payload.amount = None;
        assert!(matches!(
            add(&store, payload).await.unwrap_err(),
            AppError::Validation(_)
        ));

        assert!(matches!(
            add(&store, add_payload(&id, 0, "late")).await.unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            add(&store, add_payload(&id, -5, "late")).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn confirm_applies_the_stored_amount_once() {
        let store = Store::memory();
        let id = gym_with_bob(&store).await;

        add(&store, add_payload(&id, 10, "late")).await.unwrap();
        let penalty_id = list(&store, bobs_penalties(&id)).await.unwrap()[0].id.clone();

        // wire amount is deliberately wrong; the stored amount wins
        let outcome = confirm(&store, confirm_payload(&id, &penalty_id, 999))
            .await
            .unwrap();
        assert_eq!(outcome, ConfirmOutcome::Confirmed);
        assert_eq!(bobs_total(&store, &id).await, 10);

        let outcome = confirm(&store, confirm_payload(&id, &penalty_id, 10))
            .await
            .unwrap();
        assert_eq!(outcome, ConfirmOutcome::AlreadyConfirmed);
        assert_eq!(bobs_total(&store, &id).await, 10);
    }

    #[tokio::test]
    async fn concurrent_confirms_increment_exactly_once() {
        let store = Store::memory();
        let id = gym_with_bob(&store).await;

        add(&store, add_payload(&id, 7, "late")).await.unwrap();
        let penalty_id = list(&store, bobs_penalties(&id)).await.unwrap()[0].id.clone();

        let (a, b) = tokio::join!(
            confirm(&store, confirm_payload(&id, &penalty_id, 7)),
            confirm(&store, confirm_payload(&id, &penalty_id, 7)),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(bobs_total(&store, &id).await, 7);
    }

    #[tokio::test]
    async fn confirm_unknown_penalty_is_not_found() {
        let store = Store::memory();
        let id = gym_with_bob(&store).await;

        let err = confirm(&store, confirm_payload(&id, "missing", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("penalty not found")));
    }

    #[tokio::test]
    async fn total_equals_sum_of_confirmed_amounts() {
        let store = Store::memory();
        let id = gym_with_bob(&store).await;

        for (amount, reason) in [(5, "late"), (3, "no-show"), (8, "late again")] {
            add(&store, add_payload(&id, amount, reason)).await.unwrap();
        }

        let penalties = list(&store, bobs_penalties(&id)).await.unwrap();
        for penalty in penalties.iter().take(2) {
            confirm(&store, confirm_payload(&id, &penalty.id, 0))
                .await
                .unwrap();
        }

        let confirmed_sum: u64 = list(&store, bobs_penalties(&id))
            .await
            .unwrap()
            .iter()
            .filter(|p| p.status == PenaltyStatus::Confirmed)
            .map(|p| p.amount)
            .sum();
        assert_eq!(bobs_total(&store, &id).await, confirmed_sum);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = Store::memory();
        let id = gym_with_bob(&store).await;

        add(&store, add_payload(&id, 5, "late")).await.unwrap();
        add(&store, add_payload(&id, 3, "no-show")).await.unwrap();
        let first = list(&store, bobs_penalties(&id)).await.unwrap()[0].id.clone();
        confirm(&store, confirm_payload(&id, &first, 5)).await.unwrap();

        let mut query = bobs_penalties(&id);
        query.status = Some("pending".to_string());
        let pending = list(&store, query).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, PenaltyStatus::Pending);

        let mut query = bobs_penalties(&id);
        query.status = Some("confirmed".to_string());
        let confirmed = list(&store, query).await.unwrap();
        assert_eq!(confirmed.len(), 1);

        let mut query = bobs_penalties(&id);
        query.status = Some("rejected".to_string());
        assert!(matches!(
            list(&store, query).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }
}
