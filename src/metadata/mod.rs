pub mod exif;
pub mod text_chunks;

use std::collections::BTreeMap;

use image::ImageFormat;

use self::{
    exif::{CameraInfo, ExifExtractor, ExifStatus},
    text_chunks::{TextField, extract_text_fields},
};

/// EXIF tags whose free text may carry a generator signature.
const TEXT_BEARING_TAGS: [&str; 3] = ["Software", "ImageDescription", "UserComment"];

#[derive(Debug, Clone, Default)]
pub struct ImageMetadata {
    pub exif: ExifStatus,
    pub camera: CameraInfo,
    pub software: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub text_fields: Vec<TextField>,
}

impl ImageMetadata {
    pub fn extract(bytes: &[u8], format: Option<ImageFormat>) -> Self {
        let text_fields = extract_text_fields(bytes);

        let carries_exif = matches!(
            format,
            Some(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Tiff | ImageFormat::WebP)
        );
        if !carries_exif {
            return Self {
                text_fields,
                ..Self::default()
            };
        }

        let exif = ExifExtractor::extract(bytes);
        Self {
            exif: exif.status,
            camera: exif.camera,
            software: exif.software,
            tags: exif.tags,
            text_fields,
        }
    }

    pub fn with_camera(make: &str, model: &str) -> Self {
        Self {
            exif: ExifStatus::Present,
            camera: CameraInfo {
                make: Some(make.to_owned()),
                model: Some(model.to_owned()),
                ..CameraInfo::default()
            },
            ..Self::default()
        }
    }

    pub fn with_text_field(mut self, keyword: &str, text: &str) -> Self {
        self.text_fields.push(TextField {
            keyword: keyword.to_owned(),
            text: text.to_owned(),
        });
        self
    }

    /// Lowercased concatenation of every free-text field, keywords included.
    pub fn auxiliary_text(&self) -> String {
        let mut parts = Vec::new();

        for field in &self.text_fields {
            parts.push(field.keyword.as_str());
            parts.push(field.text.as_str());
        }
        for tag in TEXT_BEARING_TAGS {
            if let Some(value) = self.tags.get(tag) {
                parts.push(value.as_str());
            }
        }
        if let Some(ref software) = self.software {
            parts.push(software.as_str());
        }

        parts.join(" ").to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auxiliary_text_includes_keywords_and_software() {
        let mut metadata = ImageMetadata::with_camera("Nikon", "D750")
            .with_text_field("Parameters", "Sampler: Euler");
        metadata.software = Some("GIMP 2.10".into());

        let text = metadata.auxiliary_text();
        assert!(text.contains("parameters"));
        assert!(text.contains("sampler: euler"));
        assert!(text.contains("gimp"));
    }

    #[test]
    fn test_bmp_skips_exif_lookup() {
        let metadata = ImageMetadata::extract(b"BM....", Some(ImageFormat::Bmp));
        assert_eq!(metadata.exif, ExifStatus::Missing);
        assert!(metadata.text_fields.is_empty());
    }
}
