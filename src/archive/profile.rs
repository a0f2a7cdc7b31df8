use crate::archive::warn;
use crate::error::WarnCode;
use std::collections::BTreeMap;
use std::path::Path;

const IMAGE_EXTENSIONS: [&str; 6] = [".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

/// Site-relative URL of a profile image (`avatar`, `header`) in `public_dir`.
///
/// Falls back to `/<base>.jpg` when no file with a known extension exists.
pub fn find_profile_image(public_dir: &Path, base: &str) -> String {
    for ext in IMAGE_EXTENSIONS {
        if public_dir.join(format!("{base}{ext}")).is_file() {
            return format!("/{base}{ext}");
        }
    }
    warn::emit(
        WarnCode::W006ProfileImageMissing,
        "profile",
        &public_dir.display().to_string(),
        &format!("no {base} image found; using fallback"),
    );
    format!("/{base}.jpg")
}

pub fn profile_image_map(public_dir: &Path) -> BTreeMap<String, String> {
    ["avatar", "header"]
        .into_iter()
        .map(|kind| (kind.to_string(), find_profile_image(public_dir, kind)))
        .collect()
}
