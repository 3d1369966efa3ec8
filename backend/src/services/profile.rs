use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::error::AppError;
use crate::models::{ProfileUpdate, Session, User};
use crate::supabase::{AuthGateway, ObjectStorage};

pub const AVATAR_BUCKET: &str = "profile-images";
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;
const MAX_EXTENSION_LEN: usize = 5;
const ACCEPTED_FORMATS: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AvatarUpload {
    pub fn validate(&self) -> Result<(), AppError> {
        if !ACCEPTED_FORMATS.contains(&self.content_type.as_str()) {
            return Err(AppError::BadRequest(
                "Please upload a JPG, PNG, or WebP image file.".to_string(),
            ));
        }
        if self.bytes.len() > MAX_AVATAR_BYTES {
            return Err(AppError::BadRequest("File size must be less than 5MB.".to_string()));
        }
        Ok(())
    }

    /// Extension after the last dot of the original name when it is a short
    /// alphanumeric token, otherwise one derived from the content type. The
    /// result never contains a path separator.
    fn extension(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((_, ext))
                if (1..=MAX_EXTENSION_LEN).contains(&ext.len())
                    && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                ext
            }
            _ => match self.content_type.as_str() {
                "image/jpeg" | "image/jpg" => "jpg",
                "image/png" => "png",
                "image/webp" => "webp",
                _ => "bin",
            },
        }
    }
}

pub fn avatar_path(user_id: &str, upload: &AvatarUpload, unix_millis: i64) -> String {
    format!("avatars/{}-{}.{}", user_id, unix_millis, upload.extension())
}

#[derive(Clone)]
pub struct ProfileService {
    auth: Arc<dyn AuthGateway>,
    storage: Arc<dyn ObjectStorage>,
}

impl ProfileService {
    pub fn new(auth: Arc<dyn AuthGateway>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { auth, storage }
    }

    /// Merges the provided metadata fields into the user record.
    pub async fn update_profile(&self, session: &Session, update: ProfileUpdate) -> Result<User, AppError> {
        update.validate()?;
        let user = self.auth.update_user(&session.access_token, &update).await?;
        info!("updated profile of {}", user.id);
        Ok(user)
    }

    /// Stores the image and returns its public URL. The bytes are stored as-is.
    pub async fn upload_avatar(&self, session: &Session, upload: AvatarUpload) -> Result<String, AppError> {
        upload.validate()?;

        let path = avatar_path(session.user_id(), &upload, Utc::now().timestamp_millis());
        self.storage
            .upload(
                &session.access_token,
                AVATAR_BUCKET,
                &path,
                &upload.content_type,
                upload.bytes,
            )
            .await?;

        Ok(self.storage.public_url(AVATAR_BUCKET, &path))
    }

    /// Upload followed by pointing `avatar_url` at the new file.
    pub async fn change_avatar(&self, session: &Session, upload: AvatarUpload) -> Result<User, AppError> {
        let public_url = self.upload_avatar(session, upload).await?;
        self.update_profile(session, ProfileUpdate::avatar(public_url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(file_name: &str, content_type: &str, size: usize) -> AvatarUpload {
        AvatarUpload {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes: vec![0; size],
        }
    }

    #[test]
    fn only_supported_images_under_limit_pass() {
        assert!(upload("me.png", "image/png", 1024).validate().is_ok());
        assert!(upload("me.webp", "image/webp", MAX_AVATAR_BYTES).validate().is_ok());
        assert!(upload("me.gif", "image/gif", 1024).validate().is_err());
        assert!(upload("me.jpg", "image/jpeg", MAX_AVATAR_BYTES + 1).validate().is_err());
    }

    #[test]
    fn path_is_per_user_and_keeps_extension() {
        let file = upload("holiday.photo.JPG", "image/jpeg", 1);
        assert_eq!(avatar_path("u1", &file, 1736500000000), "avatars/u1-1736500000000.JPG");

        let file = upload("avatar", "image/png", 1);
        assert_eq!(avatar_path("u1", &file, 7), "avatars/u1-7.png");
    }

    #[test]
    fn hostile_names_cannot_leave_the_user_prefix() {
        for name in [
            "x./%2e%2e/%2e%2e/%2e%2e/other-bucket/owned",
            "x.png/../../other",
            "x.p%2Fng",
            "x.",
            "x.jpegjpegjpeg",
        ] {
            let file = upload(name, "image/jpeg", 1);
            assert_eq!(avatar_path("u1", &file, 42), "avatars/u1-42.jpg", "name {:?}", name);
        }

        let config = crate::config::SupabaseConfig::new("https://abc.supabase.co", "anon");
        let file = upload("x./%2e%2e/%2e%2e/%2e%2e/other-bucket/owned", "image/webp", 1);
        let url = reqwest::Url::parse(
            &config.storage_object_url(AVATAR_BUCKET, &avatar_path("u1", &file, 42)),
        )
        .expect("url should parse");
        assert_eq!(url.path(), "/storage/v1/object/profile-images/avatars/u1-42.webp");
    }
}
