use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex as TokioMutex, OnceCell};
use tracing::{debug, error, info, warn};

use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{config::Credentials, Client as S3Client};
use aws_types::region::Region;

use crate::config::settings::{AvatarConfig, ImageStoreType, S3Config};
use crate::models::{ImageUpload, StoredImage};

/// Failure reported by an image store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageStoreError {
    #[error("Upload rejected: {0}")]
    Upload(String),
}

/// External image hosting used for avatars
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the bytes as a new object and return its id and public URL
    async fn upload(&self, image: &ImageUpload) -> Result<StoredImage, ImageStoreError>;

    /// Get storage type identifier
    fn store_type(&self) -> &'static str;
}

fn new_object_key(prefix: &str, image: &ImageUpload) -> String {
    format!("{}{}.{}", prefix, uuid::Uuid::new_v4(), image.extension())
}

/// S3-based image storage
/// Stores avatars in Amazon S3 or S3-compatible storage
pub struct S3ImageStore {
    config: S3Config,
    client: OnceCell<S3Client>, // Lazy-initialized S3 client
}

impl S3ImageStore {
    pub fn new(config: &S3Config) -> Self {
        debug!("Initializing S3 image store (lazy) with bucket: {}", config.bucket);
        Self {
            config: config.clone(),
            client: OnceCell::new(),
        }
    }

    async fn create_s3_client(config: &S3Config) -> S3Client {
        let mut aws_config_builder = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        // Configure credentials if provided
        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let creds = Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "cosmic-identity-s3",
            );
            aws_config_builder = aws_config_builder.credentials_provider(creds);
        }

        let aws_config = aws_config_builder.load().await;
        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

        // Configure custom endpoint (for MinIO or other S3-compatible services)
        if let Some(endpoint_url) = &config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        S3Client::from_conf(s3_config_builder.build())
    }

    async fn get_client(&self) -> &S3Client {
        self.client
            .get_or_init(|| Self::create_s3_client(&self.config))
            .await
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn upload(&self, image: &ImageUpload) -> Result<StoredImage, ImageStoreError> {
        let key = new_object_key(&self.config.key_prefix, image);
        info!(
            "Storing avatar in S3: bucket={}, key={}, size={}",
            self.config.bucket,
            key,
            image.len()
        );

        let client = self.get_client().await;
        match client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .content_type(&image.content_type)
            .body(ByteStream::from(image.bytes.clone()))
            .send()
            .await
        {
            Ok(_) => {
                info!("Successfully stored avatar in S3: {}", key);
                Ok(StoredImage {
                    url: self.config.public_url(&key),
                    object_id: key,
                })
            }
            Err(e) => {
                error!("Failed to store avatar in S3: {}", e);
                Err(ImageStoreError::Upload(format!("Failed to store object in S3: {}", e)))
            }
        }
    }

    fn store_type(&self) -> &'static str {
        "s3"
    }
}

/// In-process image store for development and tests
pub struct MemoryImageStore {
    base_url: String,
    objects: TokioMutex<HashMap<String, ImageUpload>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::with_base_url("memory://avatars")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: TokioMutex::new(HashMap::new()),
        }
    }

    /// Ids of every stored object
    pub async fn object_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.objects.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn get(&self, object_id: &str) -> Option<ImageUpload> {
        self.objects.lock().await.get(object_id).cloned()
    }
}

impl Default for MemoryImageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn upload(&self, image: &ImageUpload) -> Result<StoredImage, ImageStoreError> {
        let object_id = new_object_key("", image);
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), object_id);
        self.objects
            .lock()
            .await
            .insert(object_id.clone(), image.clone());
        debug!("Memory image store: stored {}", object_id);
        Ok(StoredImage { object_id, url })
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

/// Image store selected by `AVATAR_STORE`
pub fn init_image_store(config: &AvatarConfig) -> Arc<dyn ImageStore> {
    match config.store_type {
        ImageStoreType::S3 => {
            info!("Using S3 image store (bucket={})", config.s3.bucket);
            Arc::new(S3ImageStore::new(&config.s3))
        }
        ImageStoreType::Memory => {
            warn!("⚠️ Using memory image store, avatars are lost on restart");
            Arc::new(MemoryImageStore::new())
        }
    }
}
