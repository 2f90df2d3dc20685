use image::{GrayImage, Luma, RgbaImage};

/// Converts a screenshot to grayscale using Rec. 709 luminance weights.
///
/// Alpha is ignored. No thresholding is applied; tesseract binarizes on
/// its own and a hard threshold loses the thin glyphs of the stat labels.
pub fn to_grayscale(img: &RgbaImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut output = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let r = pixel[0] as f32;
        let g = pixel[1] as f32;
        let b = pixel[2] as f32;

        let gray = 0.2126 * r + 0.7152 * g + 0.0722 * b;
        output.put_pixel(x, y, Luma([gray.round().clamp(0.0, 255.0) as u8]));
    }

    output
}
