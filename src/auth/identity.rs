//! Who is making a request.

use crate::db::Account;

/// The caller of an operation: an account resolved from an access token,
/// or nobody.
#[derive(Debug, Clone, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    Account(Account),
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    /// The resolved account, if any.
    pub fn account(&self) -> Option<&Account> {
        match self {
            Identity::Anonymous => None,
            Identity::Account(account) => Some(account),
        }
    }
}

impl From<Account> for Identity {
    fn from(account: Account) -> Self {
        Identity::Account(account)
    }
}
