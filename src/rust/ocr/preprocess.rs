use image::{DynamicImage, GrayImage, Luma};

/// Grayscale conversion followed by a fixed-threshold binarization: pixels
/// strictly above `threshold` become white, all others black.
pub fn binarize(image: &DynamicImage, threshold: u8) -> GrayImage {
    let mut gray = image.to_luma8();
    for pixel in gray.pixels_mut() {
        let Luma([value]) = *pixel;
        *pixel = Luma([if value > threshold { 255 } else { 0 }]);
    }
    gray
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_exclusive() {
        let gray = GrayImage::from_raw(4, 1, vec![0, 150, 151, 255]).unwrap();
        let binary = binarize(&DynamicImage::ImageLuma8(gray), 150);
        assert_eq!(binary.as_raw(), &vec![0, 0, 255, 255]);
    }

    #[test]
    fn test_color_input_becomes_single_channel() {
        let rgb = image::RgbImage::from_pixel(3, 2, image::Rgb([250, 250, 250]));
        let binary = binarize(&DynamicImage::ImageRgb8(rgb), 150);
        assert_eq!(binary.dimensions(), (3, 2));
        assert!(binary.pixels().all(|p| p.0[0] == 255));
    }
}
