//! Key builders for the document hierarchy.
//!
//! Every document lives at a slash-joined path alternating collection and id
//! segments, `competitions/{id}/users/{name}/penalties/{penaltyId}` being the
//! deepest. Services must reject ids containing `/` before building a path.

pub const COMPETITIONS: &str = "competitions";
pub const PASSPHRASES: &str = "passphrases";
const USERS: &str = "users";
const PENALTIES: &str = "penalties";

/// Full path to a single document.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocPath(String);

impl DocPath {
    pub fn key(&self) -> &str {
        &self.0
    }

    /// Splits into (collection key, document id).
    pub(crate) fn split(&self) -> (&str, &str) {
        self.0
            .rsplit_once('/')
            .expect("document path has no collection")
    }
}

/// Path to a collection of documents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn key(&self) -> &str {
        &self.0
    }
}

#[must_use]
pub fn competitions() -> CollectionPath {
    CollectionPath(COMPETITIONS.to_string())
}

#[must_use]
pub fn competition(id: &str) -> DocPath {
    DocPath(format!("{COMPETITIONS}/{id}"))
}

#[must_use]
pub fn participants(competition_id: &str) -> CollectionPath {
    CollectionPath(format!("{COMPETITIONS}/{competition_id}/{USERS}"))
}

#[must_use]
pub fn participant(competition_id: &str, user_name: &str) -> DocPath {
    DocPath(format!("{COMPETITIONS}/{competition_id}/{USERS}/{user_name}"))
}

#[must_use]
pub fn penalties(competition_id: &str, user_name: &str) -> CollectionPath {
    CollectionPath(format!(
        "{COMPETITIONS}/{competition_id}/{USERS}/{user_name}/{PENALTIES}"
    ))
}

#[must_use]
pub fn penalty(competition_id: &str, user_name: &str, penalty_id: &str) -> DocPath {
    DocPath(format!(
        "{COMPETITIONS}/{competition_id}/{USERS}/{user_name}/{PENALTIES}/{penalty_id}"
    ))
}

#[must_use]
pub fn passphrase(passphrase: &str) -> DocPath {
    DocPath(format!("{PASSPHRASES}/{passphrase}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_path_nests_under_participant() {
        let path = penalty("c1", "bob", "p1");
        assert_eq!(path.key(), "competitions/c1/users/bob/penalties/p1");

        let (collection, id) = path.split();
        assert_eq!(collection, penalties("c1", "bob").key());
        assert_eq!(id, "p1");
    }

    #[test]
    fn passphrase_index_is_its_own_collection() {
        let path = passphrase("abcd1234");
        let (collection, id) = path.split();
        assert_eq!(collection, PASSPHRASES);
        assert_eq!(id, "abcd1234");
    }
}
