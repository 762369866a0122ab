use anyhow::Context;
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::{accounts::repo::Account, role::Role, state::AppState};

const ALLOWED_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Decide the stored extension for an upload. The filename extension is
/// authoritative when present; the content type is the fallback for clients
/// that send none. Returns `None` for anything that is not an image we accept.
pub fn image_ext(filename: Option<&str>, content_type: Option<&str>) -> Option<&'static str> {
    if let Some(name) = filename {
        let (_, ext) = name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        return ALLOWED_EXTS.iter().find(|e| **e == ext).copied();
    }
    ext_from_mime(content_type?)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Upload a new profile photo under a role-scoped, collision-resistant key,
/// link it to the account, and best-effort delete the photo it replaces.
///
/// Returns the new key, or `None` if the account no longer exists (the
/// uploaded object is cleaned up in that case).
pub async fn store_profile_photo(
    state: &AppState,
    role: Role,
    account_id: Uuid,
    ext: &str,
    content_type: &str,
    body: Bytes,
) -> anyhow::Result<Option<String>> {
    let key = format!("{}/{}.{}", role.media_dir(), Uuid::new_v4(), ext);

    state
        .storage
        .put_object(&key, body, content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    // Disk write and DB link are two steps; linking first would leave a
    // dangling reference on failure, so the object goes out first.
    let old_key = match Account::set_photo_key(state.db(role), account_id, Some(&key)).await? {
        Some(old) => old,
        None => {
            if let Err(e) = state.storage.delete_object(&key).await {
                warn!(error = %e, %key, "orphan upload cleanup failed");
            }
            return Ok(None);
        }
    };

    if let Some(old) = old_key {
        if let Err(e) = state.storage.delete_object(&old).await {
            warn!(error = %e, key = %old, "replaced photo cleanup failed");
        }
    }

    Ok(Some(key))
}

/// Unlink the account's photo and best-effort delete the stored object.
/// Returns `false` if the account does not exist.
pub async fn remove_profile_photo(
    state: &AppState,
    role: Role,
    account_id: Uuid,
) -> anyhow::Result<bool> {
    let Some(old_key) = Account::set_photo_key(state.db(role), account_id, None).await? else {
        return Ok(false);
    };

    if let Some(old) = old_key {
        if let Err(e) = state.storage.delete_object(&old).await {
            warn!(error = %e, key = %old, "photo cleanup failed");
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_extension_is_filtered() {
        assert_eq!(image_ext(Some("me.jpg"), None), Some("jpg"));
        assert_eq!(image_ext(Some("ME.JPEG"), None), Some("jpeg"));
        assert_eq!(image_ext(Some("avatar.webp"), None), Some("webp"));
        assert_eq!(image_ext(Some("script.exe"), None), None);
        assert_eq!(image_ext(Some("noextension"), None), None);
    }

    #[test]
    fn filename_wins_over_content_type() {
        // A disallowed filename extension is rejected even with an image mime.
        assert_eq!(image_ext(Some("payload.svg"), Some("image/png")), None);
    }

    #[test]
    fn content_type_fallback() {
        assert_eq!(image_ext(None, Some("image/png")), Some("png"));
        assert_eq!(image_ext(None, Some("image/jpeg")), Some("jpg"));
        assert_eq!(image_ext(None, Some("application/octet-stream")), None);
        assert_eq!(image_ext(None, None), None);
    }
}
