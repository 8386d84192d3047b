//! Image metadata extraction via the `image` crate.

use std::path::Path;

use image::ImageReader;
use reportsmith_shared::{ContentRecord, FileType, Result};

use super::{Extraction, Extractor};
use crate::ooxml::fail;

/// Records dimensions, format, and colour type of raster images.
pub struct ImageExtractor;

impl Extractor for ImageExtractor {
    fn file_type(&self) -> FileType {
        FileType::Image
    }

    fn extract(&self, path: &Path) -> Result<Extraction> {
        let reader = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| fail(format!("failed to open image: {e}")))?;
        let format = reader
            .format()
            .map(|f| format!("{f:?}").to_uppercase())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let decoded = reader
            .decode()
            .map_err(|e| fail(format!("failed to decode image: {e}")))?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut extraction = Extraction::default();
        extraction.metadata.count("width", u64::from(decoded.width()));
        extraction.metadata.count("height", u64::from(decoded.height()));
        extraction
            .metadata
            .attributes
            .insert("format".into(), format);
        extraction
            .metadata
            .attributes
            .insert("mode".into(), format!("{:?}", decoded.color()));
        extraction.content.push(ContentRecord::Image {
            description: format!("Image file: {filename}"),
        });
        Ok(extraction)
    }

    fn name(&self) -> &str {
        "image"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::fixtures::Scratch;

    #[test]
    fn records_dimensions_and_format() {
        let scratch = Scratch::new("image");
        let path = scratch.path("chart.png");
        image::RgbImage::new(4, 3).save(&path).unwrap();

        let extraction = ImageExtractor.extract(&path).unwrap();
        assert_eq!(extraction.metadata.counters["width"], 4);
        assert_eq!(extraction.metadata.counters["height"], 3);
        assert_eq!(extraction.metadata.attributes["format"], "PNG");
        assert_eq!(
            extraction.content,
            vec![ContentRecord::Image {
                description: "Image file: chart.png".into()
            }]
        );
    }

    #[test]
    fn corrupt_image_is_an_error() {
        let scratch = Scratch::new("image-bad");
        let path = scratch.path("broken.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();
        assert!(ImageExtractor.extract(&path).is_err());
    }
}
