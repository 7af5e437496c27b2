use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Rotation needed to display the image upright, derived from the EXIF
/// orientation tag.
///
/// Only the plain rotations map to an angle (orientation 6 → 90, 3 → 180,
/// 8 → 270); mirrored orientations and anything unreadable come back as 0.
pub fn rotation_degrees(path: &Path) -> u32 {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return 0,
    };
    let mut reader = BufReader::new(file);
    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(_) => return 0,
    };
    let orientation = exif
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0));
    match orientation {
        Some(6) => 90,
        Some(3) => 180,
        Some(8) => 270,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_unrotated() {
        assert_eq!(rotation_degrees(Path::new("/no/such/file.jpg")), 0);
    }

    #[test]
    fn file_without_exif_reads_as_unrotated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        let image = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]));
        image.save(&path).unwrap();
        assert_eq!(rotation_degrees(&path), 0);
    }
}
