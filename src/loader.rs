//! Asynchronous texture loading.
//!
//! [`ThreadedTextureLoader`] fetches and decodes each request on its own
//! worker thread and hands results back through a channel, so the render
//! loop never waits on the network or the disk. Results are collected with
//! [`TextureLoader::poll`] once per frame.
//!
//! There is no caching and no retry: every [`TextureLoader::load`] call is
//! exactly one fetch, and a failure is reported once as an [`AssetLoadError`].

use std::fmt;
use std::path::PathBuf;

use crate::texture::{TextureId, TextureImage};

/// Where an image comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetSource {
    /// Fetched over HTTP(S).
    Url(String),
    /// Read from the local filesystem.
    Path(PathBuf),
}

impl AssetSource {
    /// Interpret a string as a URL when it has an `http://` or `https://`
    /// scheme, and as a filesystem path otherwise.
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            AssetSource::Url(source.to_string())
        } else {
            AssetSource::Path(PathBuf::from(source))
        }
    }

    /// Human-readable label, also used as the GPU texture label.
    pub fn label(&self) -> String {
        match self {
            AssetSource::Url(url) => url.clone(),
            AssetSource::Path(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Errors that can occur while fetching or decoding a texture.
#[derive(Debug, thiserror::Error)]
pub enum AssetLoadError {
    /// The file could not be read.
    #[error("failed to read {source_label}: {error}")]
    Io {
        source_label: String,
        #[source]
        error: std::io::Error,
    },
    /// The HTTP request failed or returned an error status.
    #[error("failed to fetch {source_label}: {error}")]
    Http {
        source_label: String,
        #[source]
        error: reqwest::Error,
    },
    /// The payload was not a decodable image.
    #[error("failed to decode {source_label}: {error}")]
    Decode {
        source_label: String,
        #[source]
        error: image::ImageError,
    },
    /// The worker thread went away before reporting back.
    #[error("loader for {source_label} stopped before finishing")]
    Abandoned { source_label: String },
}

/// Receipt for a pending load, matched against [`LoadResult::ticket`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadTicket(pub(crate) u64);

impl LoadTicket {
    /// Texture id given to the image this ticket resolves to.
    pub fn texture_id(self) -> TextureId {
        TextureId(self.0)
    }
}

/// Outcome of one load request.
#[derive(Debug)]
pub struct LoadResult {
    pub ticket: LoadTicket,
    pub result: Result<TextureImage, AssetLoadError>,
}

/// Something that turns asset sources into textures, eventually.
pub trait TextureLoader {
    /// Start loading `source`. Never blocks.
    fn load(&mut self, source: &AssetSource) -> LoadTicket;

    /// Collect every load that has finished since the last call. Never blocks.
    fn poll(&mut self) -> Vec<LoadResult>;
}

/// Loads each texture on a dedicated worker thread.
pub struct ThreadedTextureLoader {
    next_ticket: u64,
    sender: crossbeam_channel::Sender<LoadResult>,
    receiver: crossbeam_channel::Receiver<LoadResult>,
}

impl Default for ThreadedTextureLoader {
    fn default() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            next_ticket: 0,
            sender,
            receiver,
        }
    }
}

impl ThreadedTextureLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextureLoader for ThreadedTextureLoader {
    fn load(&mut self, source: &AssetSource) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;

        let source = source.clone();
        let sender = self.sender.clone();
        log::debug!("Loading texture {} ({:?})", source, ticket);

        let spawned = std::thread::Builder::new()
            .name(format!("texture-load-{}", ticket.0))
            .spawn({
                let source = source.clone();
                let sender = sender.clone();
                move || {
                    let result = fetch_and_decode(&source, ticket.texture_id());
                    // The receiving side only disappears at shutdown.
                    let _ = sender.send(LoadResult { ticket, result });
                }
            });

        if let Err(e) = spawned {
            log::warn!("Could not spawn loader thread for {}: {}", source, e);
            let _ = sender.send(LoadResult {
                ticket,
                result: Err(AssetLoadError::Abandoned {
                    source_label: source.label(),
                }),
            });
        }

        ticket
    }

    fn poll(&mut self) -> Vec<LoadResult> {
        self.receiver.try_iter().collect()
    }
}

/// Fetch the raw bytes of a source. Blocking.
pub fn fetch(source: &AssetSource) -> Result<Vec<u8>, AssetLoadError> {
    match source {
        AssetSource::Path(path) => std::fs::read(path).map_err(|error| AssetLoadError::Io {
            source_label: source.label(),
            error,
        }),
        AssetSource::Url(url) => {
            let http = |error| AssetLoadError::Http {
                source_label: source.label(),
                error,
            };
            let response = reqwest::blocking::get(url)
                .and_then(|r| r.error_for_status())
                .map_err(http)?;
            let bytes = response.bytes().map_err(http)?;
            Ok(bytes.to_vec())
        }
    }
}

/// Fetch and decode a source into a texture image. Blocking.
pub fn fetch_and_decode(
    source: &AssetSource,
    id: TextureId,
) -> Result<TextureImage, AssetLoadError> {
    let bytes = fetch(source)?;
    let image =
        TextureImage::decode(id, source.label(), &bytes).map_err(|error| {
            AssetLoadError::Decode {
                source_label: source.label(),
                error,
            }
        })?;
    log::info!(
        "Loaded texture {} ({}x{})",
        source,
        image.width,
        image.height
    );
    Ok(image)
}

#[cfg(test)]
pub(crate) mod testing {
    //! A loader whose results are handed out by the test.

    use super::*;

    /// Records requests and resolves them only when told to.
    #[derive(Default)]
    pub struct ScriptedLoader {
        next_ticket: u64,
        pub requests: Vec<(LoadTicket, AssetSource)>,
        ready: Vec<LoadResult>,
    }

    impl ScriptedLoader {
        /// The most recent request, if any.
        pub fn last_request(&self) -> Option<&(LoadTicket, AssetSource)> {
            self.requests.last()
        }

        /// Resolve the most recent request with a small solid image.
        pub fn succeed_last(&mut self) -> TextureId {
            let (ticket, source) = self.last_request().cloned().expect("no pending request");
            let image = TextureImage::from_rgba(
                ticket.texture_id(),
                source.label(),
                1,
                1,
                vec![200, 100, 50, 255],
            );
            self.ready.push(LoadResult {
                ticket,
                result: Ok(image),
            });
            ticket.texture_id()
        }

        /// Reject the most recent request.
        pub fn fail_last(&mut self) {
            let (ticket, source) = self.last_request().cloned().expect("no pending request");
            self.ready.push(LoadResult {
                ticket,
                result: Err(AssetLoadError::Io {
                    source_label: source.label(),
                    error: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                }),
            });
        }
    }

    impl TextureLoader for ScriptedLoader {
        fn load(&mut self, source: &AssetSource) -> LoadTicket {
            let ticket = LoadTicket(self.next_ticket);
            self.next_ticket += 1;
            self.requests.push((ticket, source.clone()));
            ticket
        }

        fn poll(&mut self) -> Vec<LoadResult> {
            std::mem::take(&mut self.ready)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for(loader: &mut ThreadedTextureLoader) -> LoadResult {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(result) = loader.poll().pop() {
                return result;
            }
            assert!(Instant::now() < deadline, "loader never reported back");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn parse_distinguishes_urls_from_paths() {
        assert_eq!(
            AssetSource::parse("https://example.com/a.jpg"),
            AssetSource::Url("https://example.com/a.jpg".into())
        );
        assert_eq!(
            AssetSource::parse("./assets/earth-burning.jpg"),
            AssetSource::Path(PathBuf::from("./assets/earth-burning.jpg"))
        );
        assert_eq!(
            AssetSource::parse("httpdocs/a.jpg"),
            AssetSource::Path(PathBuf::from("httpdocs/a.jpg"))
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut loader = ThreadedTextureLoader::new();
        let source = AssetSource::parse("definitely/not/here.jpg");
        let ticket = loader.load(&source);

        let result = wait_for(&mut loader);
        assert_eq!(result.ticket, ticket);
        assert!(matches!(result.result, Err(AssetLoadError::Io { .. })));
    }

    #[test]
    fn loads_png_from_disk() {
        let path = std::env::temp_dir().join(format!("terrasphere-{}.png", std::process::id()));
        image::RgbaImage::from_pixel(4, 2, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let mut loader = ThreadedTextureLoader::new();
        let first = loader.load(&AssetSource::Path(path.clone()));
        let result = wait_for(&mut loader);
        std::fs::remove_file(&path).ok();

        let image = result.result.expect("png should decode");
        assert_eq!((image.width, image.height), (4, 2));
        assert_eq!(image.id, first.texture_id());
    }

    #[test]
    fn default_rebirth_texture_decodes() {
        let relative = crate::config::AppConfig::default().rebirth_texture;
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(relative);

        let image = fetch_and_decode(&AssetSource::Path(path), TextureId(0))
            .expect("bundled rebirth texture should decode");
        assert_eq!((image.width, image.height), (256, 128));
        assert_eq!(image.pixels().len(), 256 * 128 * 4);
    }

    #[test]
    fn tickets_are_unique() {
        let mut loader = testing::ScriptedLoader::default();
        let a = loader.load(&AssetSource::parse("a.jpg"));
        let b = loader.load(&AssetSource::parse("a.jpg"));
        assert_ne!(a, b);
        assert_ne!(a.texture_id(), b.texture_id());
    }
}
