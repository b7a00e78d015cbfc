pub mod color;
pub mod dimensions;
pub mod edge;
pub mod filename;
pub mod format;
pub mod metadata;
pub mod pixel_pattern;

use image::RgbImage;

use crate::{
    CheckName, CheckOutcome, MediaKind,
    config::EngineConfig,
    error::{FalsifyError, Result},
    learning::PatternSnapshot,
    metadata::ImageMetadata,
};

/// A decoded raster plus whatever metadata travelled with its bytes.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub rgb: RgbImage,
    pub metadata: ImageMetadata,
    pub format: Option<String>,
}

impl ImageInput {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes).ok();
        let image = image::load_from_memory(bytes)
            .map_err(|e| FalsifyError::ImageDecode(e.to_string()))?;

        if image.width() == 0 || image.height() == 0 {
            return Err(FalsifyError::ImageDecode("image has no pixels".into()));
        }

        Ok(Self {
            rgb: image.to_rgb8(),
            metadata: ImageMetadata::extract(bytes, format),
            format: format.map(|f| format!("{f:?}").to_uppercase()),
        })
    }

    pub fn from_rgb(rgb: RgbImage, metadata: ImageMetadata) -> Self {
        Self {
            rgb,
            metadata,
            format: None,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgb.dimensions()
    }
}

/// Everything a check may look at for one upload.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub filename: &'a str,
    pub kind: MediaKind,
    pub bytes: &'a [u8],
    pub image: Option<&'a ImageInput>,
}

impl<'a> Sample<'a> {
    pub fn image(&self) -> Result<&'a ImageInput> {
        self.image.ok_or_else(|| {
            FalsifyError::AnalysisFailed(format!("{} has no decoded image", self.filename))
        })
    }
}

pub trait Check: Send + Sync {
    fn name(&self) -> CheckName;

    fn run(&self, sample: &Sample<'_>, patterns: &PatternSnapshot) -> Result<CheckOutcome>;
}

pub fn image_checks(config: &EngineConfig) -> Result<Vec<Box<dyn Check>>> {
    Ok(vec![
        Box::new(metadata::MetadataCheck::new()),
        Box::new(dimensions::DimensionsCheck::new()),
        Box::new(color::ColorCheck::new()),
        Box::new(pixel_pattern::PixelPatternCheck::new()),
        Box::new(filename::FilenameCheck::new(config.learning.clone())?),
        Box::new(edge::EdgeCheck::new()),
    ])
}

pub fn media_checks(config: &EngineConfig) -> Result<Vec<Box<dyn Check>>> {
    Ok(vec![
        Box::new(filename::FilenameCheck::new(config.learning.clone())?),
        Box::new(format::FormatCheck::new()),
    ])
}
