use std::{collections::BTreeMap, io::Cursor};

use serde::{Deserialize, Serialize};

/// Outcome of looking for an EXIF block in the uploaded bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExifStatus {
    #[default]
    Missing,
    Unreadable(String),
    Present,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub make: Option<String>,
    pub model: Option<String>,
    pub date_time_original: Option<String>,
    pub date_time_digitized: Option<String>,
}

impl CameraInfo {
    pub fn has_any(&self) -> bool {
        self.make.is_some()
            || self.model.is_some()
            || self.date_time_original.is_some()
            || self.date_time_digitized.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExifData {
    pub status: ExifStatus,
    pub camera: CameraInfo,
    pub software: Option<String>,
    pub tags: BTreeMap<String, String>,
}

pub struct ExifExtractor;

impl ExifExtractor {
    pub fn extract(bytes: &[u8]) -> ExifData {
        let mut cursor = Cursor::new(bytes);
        let exif_reader = exif::Reader::new();

        match exif_reader.read_from_container(&mut cursor) {
            Ok(exif_data) => Self::parse_exif(&exif_data),
            Err(exif::Error::NotFound(_)) => ExifData::default(),
            Err(err) => ExifData {
                status: ExifStatus::Unreadable(err.to_string()),
                ..ExifData::default()
            },
        }
    }

    fn parse_exif(exif: &exif::Exif) -> ExifData {
        let mut tags = BTreeMap::new();

        for field in exif.fields() {
            let tag_name = format!("{}", field.tag);
            let value = field.display_value().to_string();
            tags.insert(tag_name, value);
        }

        let read = |tag: exif::Tag| {
            exif.get_field(tag, exif::In::PRIMARY)
                .map(|f| f.display_value().to_string())
        };

        let camera = CameraInfo {
            make: read(exif::Tag::Make),
            model: read(exif::Tag::Model),
            date_time_original: read(exif::Tag::DateTimeOriginal),
            date_time_digitized: read(exif::Tag::DateTimeDigitized),
        };

        ExifData {
            status: ExifStatus::Present,
            camera,
            software: read(exif::Tag::Software),
            tags,
        }
    }
}
