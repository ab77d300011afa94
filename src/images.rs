use gtk::prelude::*;
use gtk::glib;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("download failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("not a decodable image: {0}")]
    Decode(#[from] glib::Error),
}

pub async fn fetch_texture(client: &reqwest::Client, url: &str) -> Result<gdk::Texture, ImageError> {
    let bytes = client.get(url).send().await?.error_for_status()?.bytes().await?;
    let bytes = glib::Bytes::from_owned(bytes);
    Ok(gdk::Texture::from_bytes(&bytes)?)
}

/// Downloads `url` into `picture` and shows it. The result is dropped if the
/// picture has been destroyed or `is_current` says the url is stale by then.
pub fn load_picture<F>(client: &reqwest::Client, picture: &gtk::Picture, url: &str, is_current: F)
where
    F: Fn(&str) -> bool + 'static,
{
    if url.is_empty() {
        picture.set_visible(false);
        return;
    }

    let client = client.clone();
    let url = url.to_string();
    let picture_weak = picture.downgrade();
    glib::spawn_future_local(async move {
        let result = fetch_texture(&client, &url).await;

        let Some(picture) = picture_weak.upgrade() else {
            return;
        };
        if !is_current(&url) {
            debug!(%url, "dropping stale image");
            return;
        }

        match result {
            Ok(texture) => {
                picture.set_paintable(Some(&texture));
                picture.set_visible(true);
            }
            Err(e) => {
                warn!(%url, error = %e, "failed to load image");
                picture.set_visible(false);
            }
        }
    });
}
