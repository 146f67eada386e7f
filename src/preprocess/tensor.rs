/// Classifier input tensor: bilinear resize to the model's fixed size, then
/// rescale to [0,1] in the model's memory layout.

use super::decode::DecodedImage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorLayout {
    /// [1, H, W, 3], Keras-style
    Nhwc,
    /// [1, 3, H, W]
    Nchw,
}

/// Fixed input geometry of a classifier, queried once from the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSpec {
    pub width: u32,
    pub height: u32,
    pub layout: TensorLayout,
}

impl InputSpec {
    pub fn shape(&self) -> [usize; 4] {
        let (h, w) = (self.height as usize, self.width as usize);
        match self.layout {
            TensorLayout::Nhwc => [1, h, w, 3],
            TensorLayout::Nchw => [1, 3, h, w],
        }
    }
}

/// Returns FP32 tensor data, normalized [0,1], in `spec.layout` order.
pub fn to_tensor(img: &DecodedImage, spec: &InputSpec) -> Result<Vec<f32>, String> {
    let resized = if img.width == spec.width && img.height == spec.height {
        img.data.clone()
    } else {
        resize_bilinear(&img.data, img.width, img.height, spec.width, spec.height)?
    };

    let (w, h) = (spec.width as usize, spec.height as usize);
    let plane = w * h;

    let tensor = match spec.layout {
        TensorLayout::Nhwc => resized.iter().map(|&v| v as f32 / 255.0).collect(),
        TensorLayout::Nchw => {
            let mut tensor = vec![0.0f32; 3 * plane];
            for (i, px) in resized.chunks_exact(3).enumerate() {
                tensor[i] = px[0] as f32 / 255.0; // R
                tensor[plane + i] = px[1] as f32 / 255.0; // G
                tensor[2 * plane + i] = px[2] as f32 / 255.0; // B
            }
            tensor
        }
    };

    Ok(tensor)
}

/// Bilinear resize for RGB images using fast_image_resize.
fn resize_bilinear(
    src: &[u8],
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
) -> Result<Vec<u8>, String> {
    use fast_image_resize as fr;

    let src_image = fr::images::Image::from_vec_u8(src_w, src_h, src.to_vec(), fr::PixelType::U8x3)
        .map_err(|e| format!("resize source {src_w}x{src_h}: {e}"))?;

    let mut dst_image = fr::images::Image::new(dst_w, dst_h, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(
            &src_image,
            &mut dst_image,
            &fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Interpolation(
                fr::FilterType::Bilinear,
            )),
        )
        .map_err(|e| format!("resize to {dst_w}x{dst_h}: {e}"))?;

    Ok(dst_image.into_vec())
}
