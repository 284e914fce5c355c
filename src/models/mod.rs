pub mod account;
pub mod image;

// re-export types from parent modules
pub use account::{
    normalize_email, Account, AccountSummary, Avatar, Credentials, CurrentAccount, NewAccount,
    ResendRequest, SubscriptionTier, TierUpdate, VerificationState,
};
pub use image::{ImageUpload, StoredImage};
