use std::sync::Arc;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::models::{AnalysisResult, ImageMime, ImagePart, NormalizedImage, UploadRequest};
use crate::services::{AnalyzerError, FoodAnalyzer, ImageNormalizer, NormalizeError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no image field in upload")]
    NoFile,
    #[error("unsupported content type: {0:?}")]
    InvalidFile(Option<String>),
    #[error("upload exceeds {limit} bytes")]
    FileTooLarge { limit: usize },
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
    #[error("internal failure: {0}")]
    Internal(String),
}

/// validate → normalize → analyze, shared by both HTTP shells.
pub struct AnalysisPipeline {
    config: PipelineConfig,
    normalizer: ImageNormalizer,
    analyzer: Arc<dyn FoodAnalyzer>,
}

impl AnalysisPipeline {
    pub fn new(config: PipelineConfig, analyzer: Arc<dyn FoodAnalyzer>) -> Self {
        let normalizer = ImageNormalizer::new(config.max_dimension, config.jpeg_quality);
        Self {
            config,
            normalizer,
            analyzer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ingress checks, first match wins: missing part, MIME type, size.
    pub fn ingest(&self, part: Option<ImagePart>) -> Result<UploadRequest, PipelineError> {
        let part = part.ok_or(PipelineError::NoFile)?;

        let content_type = part
            .content_type
            .as_deref()
            .and_then(ImageMime::from_content_type)
            .ok_or_else(|| PipelineError::InvalidFile(part.content_type.clone()))?;

        if part.data.len() > self.config.max_upload_bytes {
            return Err(PipelineError::FileTooLarge {
                limit: self.config.max_upload_bytes,
            });
        }

        Ok(UploadRequest {
            content_type,
            data: part.data,
        })
    }

    /// Decode and re-encode on the blocking pool.
    pub async fn normalize(&self, upload: UploadRequest) -> Result<NormalizedImage, PipelineError> {
        let normalizer = self.normalizer;
        let normalized = tokio::task::spawn_blocking(move || normalizer.normalize(&upload.data))
            .await
            .map_err(|e| PipelineError::Internal(format!("normalizer task failed: {}", e)))??;
        Ok(normalized)
    }

    pub async fn analyze(&self, image: &NormalizedImage) -> Result<AnalysisResult, PipelineError> {
        let timeout = self.config.analyzer_timeout;
        let started = Instant::now();

        let result = tokio::time::timeout(timeout, self.analyzer.analyze(image))
            .await
            .map_err(|_| AnalyzerError::Timeout(timeout))??;

        log::info!("✅ Analyzer answered in {} ms", started.elapsed().as_millis());
        Ok(result)
    }

    pub async fn run(&self, part: Option<ImagePart>) -> Result<AnalysisResult, PipelineError> {
        let upload = self.ingest(part)?;
        log::info!(
            "📸 Accepted upload: {} bytes ({})",
            upload.data.len(),
            upload.content_type
        );

        let normalized = self.normalize(upload).await?;
        log::debug!(
            "📊 Normalized to {}x{}, {} bytes",
            normalized.width,
            normalized.height,
            normalized.jpeg.len()
        );

        self.analyze(&normalized).await
    }
}
