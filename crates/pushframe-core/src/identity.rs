//! Client identity and message addressing.

/// Identity bound to a connection by a successful handshake.
///
/// All three fields come from the registration record, verified as a
/// unit by its HMAC tag. Empty strings are legal values (a client may
/// register without a group, for instance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Information base (tenant) the client belongs to.
    pub infobase_id: String,
    /// User identifier inside the information base.
    pub user_id: String,
    /// User group inside the information base.
    pub user_group: String,
}

/// Addressing mode of an outgoing message.
///
/// Matching is exact and case-sensitive on every field. Connections that
/// have not completed a handshake belong to no audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every connection of one user in an information base.
    User {
        /// Information base to address.
        infobase_id: String,
        /// User to address.
        user_id: String,
    },

    /// Every connection of a user group in an information base.
    Group {
        /// Information base to address.
        infobase_id: String,
        /// Group to address.
        user_group: String,
    },

    /// Every connection in an information base, regardless of user or
    /// group.
    All {
        /// Information base to address.
        infobase_id: String,
    },
}

impl Audience {
    /// Whether a registered client belongs to this audience.
    pub fn matches(&self, identity: &ClientIdentity) -> bool {
        match self {
            Self::User { infobase_id, user_id } => {
                identity.infobase_id == *infobase_id && identity.user_id == *user_id
            },
            Self::Group { infobase_id, user_group } => {
                identity.infobase_id == *infobase_id && identity.user_group == *user_group
            },
            Self::All { infobase_id } => identity.infobase_id == *infobase_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(ib: &str, user: &str, group: &str) -> ClientIdentity {
        ClientIdentity {
            infobase_id: ib.to_owned(),
            user_id: user.to_owned(),
            user_group: group.to_owned(),
        }
    }

    #[test]
    fn user_audience_matches_infobase_and_user() {
        let audience =
            Audience::User { infobase_id: "ib1".to_owned(), user_id: "alice".to_owned() };

        assert!(audience.matches(&identity("ib1", "alice", "ops")));
        assert!(audience.matches(&identity("ib1", "alice", "")));
        assert!(!audience.matches(&identity("ib2", "alice", "ops")));
        assert!(!audience.matches(&identity("ib1", "bob", "ops")));
    }

    #[test]
    fn group_audience_ignores_user() {
        let audience =
            Audience::Group { infobase_id: "ib1".to_owned(), user_group: "ops".to_owned() };

        assert!(audience.matches(&identity("ib1", "alice", "ops")));
        assert!(audience.matches(&identity("ib1", "bob", "ops")));
        assert!(!audience.matches(&identity("ib1", "alice", "dev")));
        assert!(!audience.matches(&identity("ib2", "alice", "ops")));
    }

    #[test]
    fn all_audience_matches_whole_infobase() {
        let audience = Audience::All { infobase_id: "ib1".to_owned() };

        assert!(audience.matches(&identity("ib1", "alice", "ops")));
        assert!(audience.matches(&identity("ib1", "bob", "dev")));
        assert!(!audience.matches(&identity("ib2", "alice", "ops")));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let audience =
            Audience::User { infobase_id: "ib1".to_owned(), user_id: "Alice".to_owned() };

        assert!(!audience.matches(&identity("ib1", "alice", "")));
        assert!(!audience.matches(&identity("IB1", "Alice", "")));
    }
}
