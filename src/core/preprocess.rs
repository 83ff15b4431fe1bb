use crate::core::visual::decode_rgb;
use crate::domain::model::ImageTensor;
use crate::utils::error::{Result, TriageError};
use image::imageops::{self, FilterType};

/// VGG16 channel means in BGR order.
pub const VGG_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// Decode, resize to the extractor's input size, then lay the pixels out as
/// mean-subtracted BGR in row-major HWC order.
pub fn preprocess_for_extractor(
    image_bytes: &[u8],
    extractor_name: &str,
    input_size: (u32, u32),
) -> Result<ImageTensor> {
    let (width, height) = input_size;
    if width == 0 || height == 0 {
        return Err(TriageError::ClassifierFailed {
            name: extractor_name.to_string(),
            message: format!("declared input size {}x{}", width, height),
        });
    }

    let rgb = decode_rgb(image_bytes)?;
    let resized = if rgb.dimensions() == (width, height) {
        rgb
    } else {
        imageops::resize(&rgb, width, height, FilterType::CatmullRom)
    };

    let mut data = Vec::with_capacity((width as usize) * (height as usize) * 3);
    for pixel in resized.pixels() {
        data.push(f32::from(pixel[2]) - VGG_MEAN_BGR[0]);
        data.push(f32::from(pixel[1]) - VGG_MEAN_BGR[1]);
        data.push(f32::from(pixel[0]) - VGG_MEAN_BGR[2]);
    }

    Ok(ImageTensor {
        width,
        height,
        data,
    })
}
