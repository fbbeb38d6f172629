use async_trait::async_trait;
use thiserror::Error;

use crate::engine::entities::Member;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("no member is configured, pass --member or set member_id in config.json")]
    NotConfigured,
}

/// Host lookup of the member performing the current action.
#[async_trait]
pub trait Identity: Send + Sync {
    async fn current_member(&self) -> Result<Member, IdentityError>;
}

/// [Identity] resolved once from configuration. The display name falls back to the id.
pub struct ConfiguredIdentity {
    member_id: Option<String>,
    display_name: Option<String>,
}

impl ConfiguredIdentity {
    pub fn new(member_id: Option<String>, display_name: Option<String>) -> Self {
        Self {
            member_id,
            display_name,
        }
    }
}

#[async_trait]
impl Identity for ConfiguredIdentity {
    async fn current_member(&self) -> Result<Member, IdentityError> {
        let id = self
            .member_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(IdentityError::NotConfigured)?;
        let display_name = self
            .display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(id);
        Ok(Member::new(id, display_name))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfiguredIdentity, Identity, IdentityError};

    #[tokio::test]
    async fn test_display_name_defaults_to_id() {
        let identity = ConfiguredIdentity::new(Some("ada".into()), None);
        let member = identity.current_member().await.unwrap();
        assert_eq!(member.id.as_str(), "ada");
        assert_eq!(&*member.display_name, "ada");
    }

    #[tokio::test]
    async fn test_missing_member_is_an_error() {
        let identity = ConfiguredIdentity::new(Some("  ".into()), Some("Ada".into()));
        assert!(matches!(
            identity.current_member().await,
            Err(IdentityError::NotConfigured)
        ));
    }
}
