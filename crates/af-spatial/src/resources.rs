//! HRIR asset loading
//!
//! A batch of named requests is loaded concurrently and joined by request
//! index: the resulting buffers always line up with the request order,
//! whatever order the loads finish in. One failure fails the batch.

use std::collections::HashSet;
use std::future::Future;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use af_core::AudioBuffer;
use futures_util::future::try_join_all;

use crate::error::{SpatialError, SpatialResult};

/// Where a resource's encoded bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    /// Encoded payload carried in the request
    Inline(Vec<u8>),
    /// Path or other locator resolved by the loader
    Locator(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub name: String,
    pub source: ResourceSource,
}

impl ResourceRequest {
    pub fn inline(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: ResourceSource::Inline(bytes),
        }
    }

    /// A request named after its locator
    pub fn locator(locator: impl Into<String>) -> Self {
        let locator = locator.into();
        Self {
            name: locator.clone(),
            source: ResourceSource::Locator(locator),
        }
    }
}

/// Decodes one resource into a sample buffer
pub trait ResourceLoader {
    fn load(
        &self,
        request: &ResourceRequest,
    ) -> impl Future<Output = SpatialResult<AudioBuffer>> + Send;
}

/// Decoded buffers of one batch, in request order
#[derive(Debug, Clone)]
pub struct BufferList {
    names: Vec<String>,
    buffers: Vec<AudioBuffer>,
}

impl BufferList {
    /// Start a batch load.
    ///
    /// Name collisions are rejected here, before any load begins. The
    /// returned future resolves once every buffer is decoded.
    pub fn request<L: ResourceLoader>(
        loader: &L,
        requests: Vec<ResourceRequest>,
    ) -> SpatialResult<impl Future<Output = SpatialResult<BufferList>> + '_> {
        let mut seen = HashSet::new();
        for request in &requests {
            if !seen.insert(request.name.as_str()) {
                return Err(SpatialError::DuplicateResource(request.name.clone()));
            }
        }

        Ok(async move {
            let buffers = try_join_all(requests.iter().map(|r| load_one(loader, r))).await?;
            Ok(BufferList {
                names: requests.into_iter().map(|r| r.name).collect(),
                buffers,
            })
        })
    }

    pub fn get(&self, name: &str) -> Option<&AudioBuffer> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.buffers[i])
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn buffers(&self) -> &[AudioBuffer] {
        &self.buffers
    }

    pub fn into_buffers(self) -> Vec<AudioBuffer> {
        self.buffers
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

async fn load_one<L: ResourceLoader>(
    loader: &L,
    request: &ResourceRequest,
) -> SpatialResult<AudioBuffer> {
    match loader.load(request).await {
        Ok(buffer) => {
            log::debug!(
                "Loaded '{}': {} channels, {} samples @ {} Hz",
                request.name,
                buffer.number_of_channels(),
                buffer.length(),
                buffer.sample_rate()
            );
            Ok(buffer)
        }
        Err(e) => {
            log::error!("Failed to load '{}': {}", request.name, e);
            Err(e)
        }
    }
}

/// Loads WAV resources, resolving locators against a base directory
#[derive(Debug, Clone)]
pub struct WavLoader {
    base_dir: PathBuf,
}

impl WavLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl ResourceLoader for WavLoader {
    async fn load(&self, request: &ResourceRequest) -> SpatialResult<AudioBuffer> {
        match &request.source {
            ResourceSource::Inline(bytes) => decode_wav(&request.name, bytes),
            ResourceSource::Locator(locator) => {
                let path = self.base_dir.join(locator);
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| SpatialError::ResourceLoad {
                        name: request.name.clone(),
                        reason: format!("{}: {}", path.display(), e),
                    })?;
                decode_wav(&request.name, &bytes)
            }
        }
    }
}

/// Decode a WAV payload (integer or float PCM) into a planar buffer
pub fn decode_wav(name: &str, bytes: &[u8]) -> SpatialResult<AudioBuffer> {
    let load_error = |e: hound::Error| SpatialError::ResourceLoad {
        name: name.to_string(),
        reason: e.to_string(),
    };

    let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(load_error)?;
    let spec = reader.spec();

    let samples: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| v as f64))
            .collect::<Result<Vec<_>, _>>()
            .map_err(load_error)?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .map_err(load_error)?
        }
    };

    Ok(AudioBuffer::from_interleaved(
        &samples,
        spec.channels as usize,
        spec.sample_rate,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves buffers from memory; unknown names error out
    struct MemoryLoader {
        buffers: HashMap<String, AudioBuffer>,
        calls: AtomicUsize,
    }

    impl MemoryLoader {
        fn new(names: &[&str]) -> Self {
            let buffers = names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    (
                        name.to_string(),
                        AudioBuffer::from_channels(vec![vec![i as f64; 4]; 2], 48000).unwrap(),
                    )
                })
                .collect();
            Self {
                buffers,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ResourceLoader for MemoryLoader {
        async fn load(&self, request: &ResourceRequest) -> SpatialResult<AudioBuffer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Shorter names yield longer, so later requests finish first
            for _ in 0..8usize.saturating_sub(request.name.len()) {
                tokio::task::yield_now().await;
            }
            self.buffers
                .get(&request.name)
                .cloned()
                .ok_or_else(|| SpatialError::ResourceLoad {
                    name: request.name.clone(),
                    reason: "not found".to_string(),
                })
        }
    }

    fn wav_bytes(spec: hound::WavSpec, frames: &[[f32; 2]]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for frame in frames {
                for &s in frame {
                    match spec.sample_format {
                        hound::SampleFormat::Float => writer.write_sample(s).unwrap(),
                        hound::SampleFormat::Int => {
                            writer.write_sample((s * 32768.0) as i16).unwrap()
                        }
                    }
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let loader = MemoryLoader::new(&["a", "bb", "ccc"]);
        let requests = ["a", "bb", "ccc"].map(ResourceRequest::locator).to_vec();

        let list = BufferList::request(&loader, requests).unwrap().await.unwrap();
        assert_eq!(list.names(), &["a", "bb", "ccc"]);
        for (i, buffer) in list.buffers().iter().enumerate() {
            assert_eq!(buffer.channel(0).unwrap()[0], i as f64);
        }
        assert_eq!(list.get("bb").unwrap().channel(1).unwrap()[0], 1.0);
    }

    #[tokio::test]
    async fn test_duplicates_rejected_before_loading() {
        let loader = MemoryLoader::new(&["a"]);
        let requests = vec![ResourceRequest::locator("a"), ResourceRequest::locator("a")];

        assert!(matches!(
            BufferList::request(&loader, requests),
            Err(SpatialError::DuplicateResource(name)) if name == "a"
        ));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_failure_fails_batch() {
        let loader = MemoryLoader::new(&["a"]);
        let requests = vec![ResourceRequest::locator("a"), ResourceRequest::locator("missing")];

        let result = BufferList::request(&loader, requests).unwrap().await;
        assert!(matches!(
            result,
            Err(SpatialError::ResourceLoad { name, .. }) if name == "missing"
        ));
    }

    #[test]
    fn test_decode_float_wav() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let bytes = wav_bytes(spec, &[[0.5, -0.25], [1.0, 0.0]]);

        let buffer = decode_wav("float", &bytes).unwrap();
        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.channel(0).unwrap(), &[0.5, 1.0]);
        assert_eq!(buffer.channel(1).unwrap(), &[-0.25, 0.0]);
    }

    #[test]
    fn test_decode_int_wav() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[[0.5, -0.5]]);

        let buffer = decode_wav("int", &bytes).unwrap();
        assert_eq!(buffer.channel(0).unwrap(), &[0.5]);
        assert_eq!(buffer.channel(1).unwrap(), &[-0.5]);
    }

    #[test]
    fn test_decode_garbage_names_resource() {
        let err = decode_wav("broken.wav", b"not a wav file").unwrap_err();
        assert!(matches!(err, SpatialError::ResourceLoad { name, .. } if name == "broken.wav"));
    }

    #[tokio::test]
    async fn test_wav_loader_inline_and_missing_file() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let loader = WavLoader::new(std::env::temp_dir().join("af-spatial-missing-assets"));

        let inline = ResourceRequest::inline("inline", wav_bytes(spec, &[[0.25, 0.75]]));
        let buffer = loader.load(&inline).await.unwrap();
        assert_eq!(buffer.channel(1).unwrap(), &[0.75]);

        let missing = ResourceRequest::locator("hrir/foa-1.wav");
        assert!(matches!(
            loader.load(&missing).await,
            Err(SpatialError::ResourceLoad { .. })
        ));
    }
}
