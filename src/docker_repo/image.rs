// Content-hash image references resolved to repository names, memoized

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::error;

use super::client::{ImageInspect, RuntimeClient};

const CONTENT_HASH_PREFIX: &str = "sha256:";

/// Prefer the first tag, then the first digest without its `@sha256:` suffix,
/// then the reference itself.
fn name_from_inspect(image: &str, inspect: &ImageInspect) -> String {
    if let Some(tag) = inspect.repo_tags.first() {
        return tag.clone();
    }
    if let Some(digest) = inspect.repo_digests.first() {
        // Digests are formatted like quay.io/foo/bar@sha256:hash
        let repo = digest.split_once('@').map_or(digest.as_str(), |(r, _)| r);
        return repo.to_string();
    }
    image.to_string()
}

#[derive(Default)]
pub struct ImageNameCache {
    names: Mutex<HashMap<String, String>>,
}

impl ImageNameCache {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve `image` to a readable name. Never fails: unresolvable references
    /// come back unchanged and are cached as such.
    pub async fn resolve(&self, client: &dyn RuntimeClient, image: &str) -> String {
        if !image.starts_with(CONTENT_HASH_PREFIX) {
            return image.to_string();
        }
        if let Some(name) = self.lock().get(image) {
            return name.clone();
        }

        let name = match client.inspect_image(image).await {
            Ok(inspect) => name_from_inspect(image, &inspect),
            Err(e) => {
                // Some images are legitimately missing from inspect.
                if !e.is_not_found() {
                    error!(image, error = %e, "could not extract image name");
                }
                image.to_string()
            }
        };
        self.lock().insert(image.to_string(), name.clone());
        name
    }

    /// Drop entries for images no longer referenced by a live container.
    pub fn retain_live(&self, live_images: &HashSet<&str>) {
        self.lock().retain(|image, _| live_images.contains(image.as_str()));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
