//! Render orchestration.
//!
//! [`RenderService::render`] runs one request end to end: identity, asset
//! fetch, watermark raster, then the raster or PDF pipeline. The result is a
//! [`RenderOutcome`], which keeps "watermarked", "served as-is by policy" and
//! "failed" apart so callers and tests never have to infer them from logs.

pub mod codec;
pub mod raster;

use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;

pub use codec::{decode_image, encode_image, EncodedImage, OutputFormat};
pub use raster::{render_raster, RasterRendering};

use crate::asset::{AssetKind, AssetResolver, ResolvedAsset};
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::identity::{IdentityResolver, ResolvedIdentity};
use crate::metrics::RenderMetrics;
use crate::pdf::render_pdf;
use crate::store::ObjectStore;
use crate::watermark::{TemplateContext, WatermarkProvider};

/// One render request, as parsed by the transport layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderRequest {
    pub bucket: String,
    pub file: String,
    /// Fallback text; the configured default when absent
    pub watermark_text: Option<String>,
    /// Pre-rendered raster, base64 or data URL
    pub watermark_image: Option<String>,
    /// Inclusive 1-based page window
    pub window: Option<(i64, i64)>,
    pub username: Option<String>,
}

/// Bytes ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub bytes: Bytes,
    pub content_type: String,
    pub filename: String,
}

#[derive(Debug)]
pub enum RenderOutcome {
    /// Watermarked output
    Rendered {
        output: RenderedOutput,
        tiles: usize,
        skipped_tiles: usize,
    },
    /// A passthrough kind, returned unmodified
    Passthrough(RenderedOutput),
    /// Image watermarking failed outright; the original bytes are served
    DegradedOriginal { output: RenderedOutput, reason: String },
    Failed(RenderError),
}

impl RenderOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderOutcome::Rendered { .. } => "rendered",
            RenderOutcome::Passthrough(_) => "passthrough",
            RenderOutcome::DegradedOriginal { .. } => "degraded_original",
            RenderOutcome::Failed(_) => "failed",
        }
    }

    pub fn is_watermarked(&self) -> bool {
        matches!(self, RenderOutcome::Rendered { .. })
    }

    pub fn into_result(self) -> Result<RenderedOutput, RenderError> {
        match self {
            RenderOutcome::Rendered { output, .. }
            | RenderOutcome::Passthrough(output)
            | RenderOutcome::DegradedOriginal { output, .. } => Ok(output),
            RenderOutcome::Failed(e) => Err(e),
        }
    }
}

/// Last path segment of an object key
pub fn filename_of(key: &str) -> &str {
    key.rsplit('/').find(|s| !s.is_empty()).unwrap_or(key)
}

pub struct RenderService {
    assets: AssetResolver,
    identity: IdentityResolver,
    provider: Arc<WatermarkProvider>,
    config: RenderConfig,
}

impl RenderService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        identity: IdentityResolver,
        provider: WatermarkProvider,
        config: RenderConfig,
    ) -> Self {
        Self {
            assets: AssetResolver::new(store, config.max_object_bytes),
            identity,
            provider: Arc::new(provider),
            config,
        }
    }

    /// Runs one request; `token` is the bearer credential, already known to
    /// be present.
    pub async fn render(&self, request: RenderRequest, token: &str, client_ip: Option<&str>) -> RenderOutcome {
        let started = Instant::now();
        let kind = AssetKind::classify(&request.file);

        let outcome = match self.render_inner(&request, token, client_ip).await {
            Ok(outcome) => outcome,
            Err(e) => RenderOutcome::Failed(e),
        };

        let metrics = RenderMetrics::global();
        metrics.record_request(kind.as_str(), outcome.as_str(), started.elapsed().as_secs_f64());
        match &outcome {
            RenderOutcome::Rendered { skipped_tiles, .. } => {
                metrics.record_skipped_tiles(kind.as_str(), *skipped_tiles);
            }
            RenderOutcome::DegradedOriginal { reason, .. } => {
                tracing::warn!(bucket = %request.bucket, file = %request.file, reason = %reason, "Serving original image without watermark");
            }
            RenderOutcome::Failed(e) => {
                tracing::warn!(bucket = %request.bucket, file = %request.file, error = %e, kind = e.kind(), "Render failed");
            }
            RenderOutcome::Passthrough(_) => {}
        }
        tracing::info!(
            bucket = %request.bucket,
            file = %request.file,
            outcome = outcome.as_str(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Render complete"
        );

        outcome
    }

    async fn render_inner(
        &self,
        request: &RenderRequest,
        token: &str,
        client_ip: Option<&str>,
    ) -> Result<RenderOutcome, RenderError> {
        let identity = self.identity.resolve(request.username.as_deref(), token).await?;
        RenderMetrics::global().record_identity(identity.source.as_str());

        let asset = self.assets.fetch(&request.bucket, &request.file).await?;
        let filename = filename_of(&request.file).to_string();

        match asset.kind {
            AssetKind::Passthrough => Ok(RenderOutcome::Passthrough(RenderedOutput {
                bytes: asset.bytes,
                content_type: asset.content_type,
                filename,
            })),
            AssetKind::Image | AssetKind::Pdf => {
                let context = self.template_context(request, &identity, client_ip);
                self.watermark(request, asset, context, filename).await
            }
        }
    }

    fn template_context(
        &self,
        request: &RenderRequest,
        identity: &ResolvedIdentity,
        client_ip: Option<&str>,
    ) -> TemplateContext {
        let text = request
            .watermark_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.provider.default_text());
        TemplateContext::new(identity.display_name.clone(), text)
            .with_ip(client_ip)
            .with_object(request.bucket.clone(), request.file.clone())
    }

    /// CPU-bound decode/composite/encode, off the async workers.
    async fn watermark(
        &self,
        request: &RenderRequest,
        asset: ResolvedAsset,
        context: TemplateContext,
        filename: String,
    ) -> Result<RenderOutcome, RenderError> {
        let provider = Arc::clone(&self.provider);
        let config = self.config.clone();
        let supplied = request.watermark_image.clone();
        let window = request.window;
        let key = request.file.clone();

        tokio::task::spawn_blocking(move || {
            let raster = provider.provide(supplied.as_deref(), &context);
            tracing::debug!(
                origin = raster.origin.as_str(),
                width = raster.width(),
                height = raster.height(),
                "Watermark raster ready"
            );

            match asset.kind {
                AssetKind::Pdf => {
                    let rendering = render_pdf(&asset.bytes, window, &raster, &config)?;
                    Ok(RenderOutcome::Rendered {
                        output: RenderedOutput {
                            bytes: Bytes::from(rendering.bytes),
                            content_type: "application/pdf".to_string(),
                            filename,
                        },
                        tiles: rendering.report.tiles,
                        skipped_tiles: rendering.report.skipped.len(),
                    })
                }
                _ => Ok(match render_raster(&asset.bytes, &key, &raster, &config) {
                    Ok(rendering) => RenderOutcome::Rendered {
                        output: RenderedOutput {
                            content_type: rendering.encoded.content_type().to_string(),
                            bytes: Bytes::from(rendering.encoded.data),
                            filename,
                        },
                        tiles: rendering.report.total(),
                        skipped_tiles: rendering.report.skipped.len(),
                    },
                    Err(e) => RenderOutcome::DegradedOriginal {
                        output: RenderedOutput {
                            bytes: asset.bytes,
                            content_type: asset.content_type,
                            filename,
                        },
                        reason: e.to_string(),
                    },
                }),
            }
        })
        .await
        .map_err(|e| RenderError::Processing(format!("Render task failed: {}", e)))?
    }
}
