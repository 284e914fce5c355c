// Module declarations
pub mod account_service;
pub mod avatar_service;
pub mod notification_service;
pub mod session_service;
pub mod verification_service;

// Public re-exports
pub use account_service::AccountLifecycleService;
pub use avatar_service::AvatarUploadCoordinator;
pub use notification_service::{
    HttpMailTransport, LogMailTransport, MailError, MailMessage, MailTransport,
    MemoryMailTransport, NotificationDispatcher, NotificationOutcome,
};
pub use session_service::SessionWorkflow;
pub use verification_service::{SignupReport, VerificationWorkflow};
