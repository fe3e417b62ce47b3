//! Asset loading.
//!
//! Textures and the font are fetched in the background, one task per file, and
//! every outcome is posted back to the event loop as an [`AssetEvent`]. Loads
//! are independent of each other: there is no ordering between them, no retry
//! and no cancellation. A failed load is reported once and then forgotten.
//!
//! Native builds read from the asset root with `tokio::fs`; web builds fetch
//! relative to the page origin with `reqwest`.

use std::future::Future;

#[cfg(not(target_arch = "wasm32"))]
use anyhow::Context as _;

use crate::{
    config::SceneConfig,
    resources::{
        font::Font,
        texture::{TextureHandle, TextureRegistry},
    },
};

pub mod font;
pub mod texture;

#[cfg(target_arch = "wasm32")]
fn format_url(root: &str, file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page has no origin"))?;
    let root = root.trim_matches('/');
    let base = if root.is_empty() {
        format!("{origin}/")
    } else {
        format!("{origin}/{root}/")
    };
    Ok(reqwest::Url::parse(&base)?.join(file_name)?)
}

pub async fn load_string(root: &str, file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(root, file_name)?;
        reqwest::get(url).await?.error_for_status()?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = std::path::Path::new(root).join(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(txt)
}

pub async fn load_binary(root: &str, file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(root, file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new(root).join(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(data)
}

pub async fn load_font(root: &str, file_name: &str) -> anyhow::Result<Font> {
    let json = load_string(root, file_name).await?;
    Font::from_json(&json)
}

/// Outcome of one background load.
pub enum AssetEvent {
    TextureLoaded {
        handle: TextureHandle,
        image: image::RgbaImage,
    },
    TextureFailed {
        handle: TextureHandle,
    },
    FontLoaded(Font),
}

impl std::fmt::Debug for AssetEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TextureLoaded { handle, image } => f
                .debug_struct("TextureLoaded")
                .field("handle", handle)
                .field("size", &image.dimensions())
                .finish(),
            Self::TextureFailed { handle } => {
                f.debug_struct("TextureFailed").field("handle", handle).finish()
            }
            Self::FontLoaded(font) => f.debug_tuple("FontLoaded").field(&font.family_name).finish(),
        }
    }
}

/// Receiver of [`AssetEvent`]s, usually a closure around an event loop proxy.
#[cfg(not(target_arch = "wasm32"))]
pub trait AssetSink: Fn(AssetEvent) + Clone + Send + 'static {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Fn(AssetEvent) + Clone + Send + 'static> AssetSink for T {}

#[cfg(target_arch = "wasm32")]
pub trait AssetSink: Fn(AssetEvent) + Clone + 'static {}
#[cfg(target_arch = "wasm32")]
impl<T: Fn(AssetEvent) + Clone + 'static> AssetSink for T {}

/// Where background loads run.
#[cfg(not(target_arch = "wasm32"))]
pub type Spawner = tokio::runtime::Handle;
#[cfg(target_arch = "wasm32")]
pub type Spawner = ();

#[cfg(not(target_arch = "wasm32"))]
fn spawn<F: Future<Output = ()> + Send + 'static>(spawner: &Spawner, fut: F) {
    spawner.spawn(fut);
}

#[cfg(target_arch = "wasm32")]
fn spawn<F: Future<Output = ()> + 'static>(_spawner: &Spawner, fut: F) {
    wasm_bindgen_futures::spawn_local(fut);
}

/// Starts one load per pending texture plus one for the font. Each finished
/// load is handed to `sink`; a font that fails to load only produces a warning.
pub fn spawn_asset_loads<S: AssetSink>(
    spawner: &Spawner,
    config: &SceneConfig,
    textures: &TextureRegistry,
    sink: S,
) {
    for (handle, entry) in textures.pending() {
        let root = config.asset_root.clone();
        let path = entry.path.clone();
        let sink = sink.clone();
        spawn(spawner, async move {
            match texture::load_image(&root, &path).await {
                Ok(image) => {
                    log::debug!("loaded texture {path} ({}x{})", image.width(), image.height());
                    sink(AssetEvent::TextureLoaded { handle, image });
                }
                Err(e) => {
                    log::warn!("texture {path} failed to load: {e:#}");
                    sink(AssetEvent::TextureFailed { handle });
                }
            }
        });
    }

    let root = config.asset_root.clone();
    let path = config.assets.font.clone();
    spawn(spawner, async move {
        match load_font(&root, &path).await {
            Ok(font) => {
                log::debug!("loaded font {path}");
                sink(AssetEvent::FontLoaded(font));
            }
            Err(e) => log::warn!("font {path} failed to load: {e:#}"),
        }
    });
}
