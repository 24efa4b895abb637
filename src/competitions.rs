//! Competition membership: create, join by passphrase, list, details.

use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        require_field, require_segment, Competition, CompetitionDetails, CreateCompetitionPayload,
        JoinCompetitionPayload, Participant, PassphraseIndex,
    },
    store::{paths, Store, Tx, WriteSet},
};

/// Allocates a competition with the creator as sole participant. Passphrases
/// are unique: the index document is watched, so two concurrent creates with
/// the same passphrase cannot both commit.
pub async fn create(store: &Store, payload: CreateCompetitionPayload) -> Result<String, AppError> {
    const MSG: &str = "name, passphrase, and user name are required";
    let name = require_field(payload.name, MSG)?;
    let passphrase = require_segment(payload.passphrase, MSG)?;
    let user_name = require_segment(payload.user_name, MSG)?;

    let id = Uuid::new_v4().to_string();
    let index_path = paths::passphrase(&passphrase);

    store
        .transact(&[index_path.clone()], |tx| {
            if tx.get(&index_path).is_some() {
                return Err(AppError::PassphraseTaken);
            }

            let mut writes = WriteSet::new();
            writes.put(
                index_path.clone(),
                &PassphraseIndex {
                    competition_id: id.clone(),
                },
            )?;
            writes.put(
                paths::competition(&id),
                &Competition {
                    id: id.clone(),
                    name: name.clone(),
                    passphrase: passphrase.clone(),
                    users: vec![user_name.clone()],
                },
            )?;
            writes.put(
                paths::participant(&id, &user_name),
                &Participant {
                    name: user_name.clone(),
                    total_penalty: 0,
                },
            )?;
            Ok(Tx::Commit(writes, ()))
        })
        .await?;

    info!("{user_name} created competition {id}");
    Ok(id)
}

/// Adds a user to the competition matching the passphrase. Idempotent: the
/// membership list is a set-union append, and an existing participant
/// document keeps its accumulated total.
pub async fn join(store: &Store, payload: JoinCompetitionPayload) -> Result<String, AppError> {
    const MSG: &str = "passphrase and user name are required";
    let passphrase = require_segment(payload.passphrase, MSG)?;
    let user_name = require_segment(payload.user_name, MSG)?;

    let index: Option<PassphraseIndex> = store.get(&paths::passphrase(&passphrase)).await?;
    let Some(index) = index else {
        return Err(AppError::NotFound(
            "competition not found with that passphrase",
        ));
    };
    let id = index.competition_id;

    let competition_path = paths::competition(&id);
    let participant_path = paths::participant(&id, &user_name);

    store
        .transact(
            &[competition_path.clone(), participant_path.clone()],
            |tx| {
                let Some(mut competition) = tx.deserialize::<Competition>(&competition_path)?
                else {
                    return Err(AppError::NotFound("competition not found"));
                };

                if !competition.users.contains(&user_name) {
                    competition.users.push(user_name.clone());
                }

                let mut writes = WriteSet::new();
                writes.put(competition_path.clone(), &competition)?;
                if tx.get(&participant_path).is_none() {
                    writes.put(
                        participant_path.clone(),
                        &Participant {
                            name: user_name.clone(),
                            total_penalty: 0,
                        },
                    )?;
                }
                Ok(Tx::Commit(writes, ()))
            },
        )
        .await?;

    info!("{user_name} joined competition {id}");
    Ok(id)
}

pub async fn list(store: &Store) -> Result<Vec<Competition>, AppError> {
    let mut competitions: Vec<Competition> = store.scan(&paths::competitions(), None).await?;
    competitions.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(competitions)
}

pub async fn details(
    store: &Store,
    competition_id: Option<String>,
) -> Result<CompetitionDetails, AppError> {
    let id = require_segment(competition_id, "competition id is required")?;

    let competition: Option<Competition> = store.get(&paths::competition(&id)).await?;
    let Some(competition) = competition else {
        return Err(AppError::NotFound("competition not found"));
    };

    let mut users: Vec<Participant> = store.scan(&paths::participants(&id), None).await?;
    users.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(CompetitionDetails {
        id: competition.id,
        name: competition.name,
        passphrase: competition.passphrase,
        users,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_payload(name: &str, passphrase: &str, user: &str) -> CreateCompetitionPayload {
        CreateCompetitionPayload {
            name: Some(name.to_string()),
            passphrase: Some(passphrase.to_string()),
            user_name: Some(user.to_string()),
        }
    }

    fn join_payload(passphrase: &str, user: &str) -> JoinCompetitionPayload {
        JoinCompetitionPayload {
            passphrase: Some(passphrase.to_string()),
            user_name: Some(user.to_string()),
        }
    }

    #[tokio::test]
    async fn create_seeds_the_creator_with_zero_total() {
        let store = Store::memory();
        let id = create(&store, create_payload("Gym", "abcd1234", "alice"))
            .await
            .unwrap();

        let details = details(&store, Some(id)).await.unwrap();
        assert_eq!(details.name, "Gym");
        assert_eq!(details.users.len(), 1);
        assert_eq!(details.users[0].name, "alice");
        assert_eq!(details.users[0].total_penalty, 0);
    }

    #[tokio::test]
    async fn duplicate_passphrase_is_rejected() {
        let store = Store::memory();
        let first = create(&store, create_payload("Gym", "abcd1234", "alice"))
            .await
            .unwrap();

        let err = create(&store, create_payload("Office", "abcd1234", "carol"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PassphraseTaken));

        // the first competition is untouched
        let joined = join(&store, join_payload("abcd1234", "bob")).await.unwrap();
        assert_eq!(joined, first);
    }

    #[tokio::test]
    async fn join_unknown_passphrase_is_not_found() {
        let store = Store::memory();
        let err = join(&store, join_payload("nope", "bob")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn join_twice_keeps_one_membership_entry() {
        let store = Store::memory();
        let id = create(&store, create_payload("Gym", "abcd1234", "alice"))
            .await
            .unwrap();

        join(&store, join_payload("abcd1234", "bob")).await.unwrap();
        join(&store, join_payload("abcd1234", "bob")).await.unwrap();

        let competition: Competition = store
            .get(&paths::competition(&id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(competition.users, vec!["alice", "bob"]);

        let details = details(&store, Some(id)).await.unwrap();
        assert_eq!(details.users.len(), 2);
    }

    #[tokio::test]
    async fn missing_fields_are_validation_errors() {
        let store = Store::memory();

        let err = create(
            &store,
            CreateCompetitionPayload {
                name: Some("Gym".to_string()),
                passphrase: None,
                user_name: Some("alice".to_string()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = join(
            &store,
            JoinCompetitionPayload {
                passphrase: Some(String::new()),
                user_name: Some("bob".to_string()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn slashes_in_segments_are_rejected() {
        let store = Store::memory();
        let err = create(&store, create_payload("Gym", "abcd1234", "a/b"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
