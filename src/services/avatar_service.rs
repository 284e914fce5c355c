use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::error::{IdentityError, Result};
use crate::models::{Avatar, ImageUpload};
use crate::storage::{AccountStore, ImageStore};

/// Two-phase avatar update: upload to the image store, then record the
/// new object on the account in one write.
pub struct AvatarUploadCoordinator {
    accounts: Arc<dyn AccountStore>,
    images: Arc<dyn ImageStore>,
    max_bytes: usize,
}

impl AvatarUploadCoordinator {
    pub fn new(accounts: Arc<dyn AccountStore>, images: Arc<dyn ImageStore>, max_bytes: usize) -> Self {
        Self {
            accounts,
            images,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn check_size(&self, image: &ImageUpload) -> Result<()> {
        if image.is_empty() {
            return Err(IdentityError::validation("Avatar image is empty"));
        }
        if image.len() > self.max_bytes {
            return Err(IdentityError::validation(format!(
                "Avatar image exceeds {} bytes",
                self.max_bytes
            )));
        }
        Ok(())
    }

    /// Replace the avatar of `identity`, returning the new public URL.
    ///
    /// The previous object is left in the store. If the account write fails
    /// after a successful upload the new object is orphaned; a retry simply
    /// uploads another one.
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    pub async fn upload_avatar(&self, identity: &str, image: ImageUpload) -> Result<String> {
        self.check_size(&image)?;

        let stored = self.images.upload(&image).await.map_err(|e| {
            error!("Avatar upload for {} failed: {}", identity, e);
            IdentityError::UploadFailed(e.to_string())
        })?;

        let avatar = Avatar {
            object_id: stored.object_id,
            url: stored.url,
        };

        match self.accounts.update_avatar(identity, &avatar).await {
            Ok(Some(account)) => {
                info!("Avatar updated for account {}", account.id);
                Ok(avatar.url)
            }
            Ok(None) => {
                warn!(
                    "Account {} vanished before avatar write, orphaned object {}",
                    identity, avatar.object_id
                );
                Err(IdentityError::not_found("User not found"))
            }
            Err(e) => {
                warn!(
                    "Avatar write for {} failed, orphaned object {}: {}",
                    identity, avatar.object_id, e
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, StoredImage, SubscriptionTier, VerificationState};
    use crate::storage::{self, ImageStoreError, MemoryAccountStore, MemoryImageStore, StorageError};
    use async_trait::async_trait;

    struct RejectingImageStore;

    #[async_trait]
    impl ImageStore for RejectingImageStore {
        async fn upload(&self, _image: &ImageUpload) -> std::result::Result<StoredImage, ImageStoreError> {
            Err(ImageStoreError::Upload("quota exceeded".to_string()))
        }

        fn store_type(&self) -> &'static str {
            "rejecting"
        }
    }

    /// Reads work, avatar writes fail
    struct BrokenAvatarWrites(MemoryAccountStore);

    #[async_trait]
    impl AccountStore for BrokenAvatarWrites {
        async fn health_check(&self) -> storage::Result<bool> {
            Ok(true)
        }
        async fn create(&self, account: &Account) -> storage::Result<()> {
            self.0.create(account).await
        }
        async fn find_by_id(&self, id: &str) -> storage::Result<Option<Account>> {
            self.0.find_by_id(id).await
        }
        async fn find_by_email(&self, email: &str) -> storage::Result<Option<Account>> {
            self.0.find_by_email(email).await
        }
        async fn find_by_verification_token(&self, token: &str) -> storage::Result<Option<Account>> {
            self.0.find_by_verification_token(token).await
        }
        async fn update_session_token(&self, id: &str, token: Option<&str>) -> storage::Result<Option<Account>> {
            self.0.update_session_token(id, token).await
        }
        async fn update_verification(&self, id: &str, state: VerificationState) -> storage::Result<Option<Account>> {
            self.0.update_verification(id, state).await
        }
        async fn update_avatar(&self, _id: &str, _avatar: &Avatar) -> storage::Result<Option<Account>> {
            Err(StorageError::Connection("connection reset".to_string()))
        }
        async fn update_tier(&self, id: &str, tier: SubscriptionTier) -> storage::Result<Option<Account>> {
            self.0.update_tier(id, tier).await
        }
    }

    async fn seeded_store() -> (Arc<MemoryAccountStore>, String) {
        let store = Arc::new(MemoryAccountStore::new());
        let account = Account::new_unverified("a@x.com", "h".to_string(), None, "t".to_string());
        let id = account.id.clone();
        store.create(&account).await.unwrap();
        (store, id)
    }

    fn png() -> ImageUpload {
        ImageUpload::new(vec![0x89u8, b'P', b'N', b'G'], "image/png")
    }

    #[tokio::test]
    async fn successful_upload_sets_avatar_pair() {
        let (accounts, id) = seeded_store().await;
        let images = Arc::new(MemoryImageStore::new());
        let coordinator = AvatarUploadCoordinator::new(accounts.clone(), images.clone(), 1024);

        let url = coordinator.upload_avatar(&id, png()).await.unwrap();

        let avatar = accounts.find_by_id(&id).await.unwrap().unwrap().avatar.unwrap();
        assert_eq!(avatar.url, url);
        assert_eq!(images.object_ids().await, vec![avatar.object_id]);
    }

    #[tokio::test]
    async fn second_upload_keeps_previous_object() {
        let (accounts, id) = seeded_store().await;
        let images = Arc::new(MemoryImageStore::new());
        let coordinator = AvatarUploadCoordinator::new(accounts.clone(), images.clone(), 1024);

        let first = coordinator.upload_avatar(&id, png()).await.unwrap();
        let second = coordinator.upload_avatar(&id, png()).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(images.object_ids().await.len(), 2);
        let account = accounts.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(account.avatar.unwrap().url, second);
    }

    #[tokio::test]
    async fn image_store_failure_leaves_account_untouched() {
        let (accounts, id) = seeded_store().await;
        let coordinator =
            AvatarUploadCoordinator::new(accounts.clone(), Arc::new(RejectingImageStore), 1024);

        let err = coordinator.upload_avatar(&id, png()).await.unwrap_err();
        assert!(matches!(err, IdentityError::UploadFailed(_)));
        assert!(accounts.find_by_id(&id).await.unwrap().unwrap().avatar.is_none());
    }

    #[tokio::test]
    async fn account_write_failure_is_returned_after_upload() {
        let inner = MemoryAccountStore::new();
        let account = Account::new_unverified("a@x.com", "h".to_string(), None, "t".to_string());
        inner.create(&account).await.unwrap();
        let accounts = Arc::new(BrokenAvatarWrites(inner));
        let images = Arc::new(MemoryImageStore::new());
        let coordinator = AvatarUploadCoordinator::new(accounts.clone(), images.clone(), 1024);

        let err = coordinator.upload_avatar(&account.id, png()).await.unwrap_err();
        assert!(matches!(err, IdentityError::Storage(_)));
        assert_eq!(images.object_ids().await.len(), 1);
        assert!(accounts.find_by_id(&account.id).await.unwrap().unwrap().avatar.is_none());
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let coordinator = AvatarUploadCoordinator::new(
            Arc::new(MemoryAccountStore::new()),
            Arc::new(MemoryImageStore::new()),
            1024,
        );
        let err = coordinator.upload_avatar("missing", png()).await.unwrap_err();
        assert!(matches!(err, IdentityError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_and_oversized_images_are_rejected_before_upload() {
        let (accounts, id) = seeded_store().await;
        let images = Arc::new(MemoryImageStore::new());
        let coordinator = AvatarUploadCoordinator::new(accounts, images.clone(), 3);

        let empty = ImageUpload::new(Vec::<u8>::new(), "image/png");
        assert!(matches!(
            coordinator.upload_avatar(&id, empty).await,
            Err(IdentityError::Validation(_))
        ));
        assert!(matches!(
            coordinator.upload_avatar(&id, png()).await,
            Err(IdentityError::Validation(_))
        ));
        assert!(images.object_ids().await.is_empty());
    }
}
