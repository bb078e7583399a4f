//! Profile repository trait.

use async_trait::async_trait;

use super::model::{NewProfile, Profile};
use crate::error::Result;

/// Storage port for application profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Looks up the profile for an identity id.
    ///
    /// `Ok(None)` means the lookup succeeded and no record exists.
    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>>;

    /// Inserts a profile and returns the stored record.
    async fn create(&self, profile: &NewProfile) -> Result<Profile>;
}
