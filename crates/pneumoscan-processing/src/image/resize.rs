use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Output size for a longer-edge cap.
///
/// The longer edge maps exactly to the cap and the shorter edge is scaled by the
/// same ratio. Images already within the cap keep their size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDimensions {
    pub width: u32,
    pub height: u32,
}

impl TargetDimensions {
    /// Calculate target dimensions so that neither edge exceeds `max_edge`.
    /// Ties (square images) are handled on the height branch.
    pub fn fit_longer_edge(width: u32, height: u32, max_edge: u32) -> Self {
        if width > height {
            if width > max_edge {
                return Self {
                    width: max_edge,
                    height: scale_edge(height, max_edge, width),
                };
            }
        } else if height > max_edge {
            return Self {
                width: scale_edge(width, max_edge, height),
                height: max_edge,
            };
        }

        Self { width, height }
    }

    pub fn is_unchanged_from(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    pub fn as_tuple(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn scale_edge(edge: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = (edge as f64 * numerator as f64 / denominator as f64).round() as u32;
    scaled.max(1)
}

/// Select appropriate filter type based on resize ratio
pub fn select_filter(orig_width: u32, orig_height: u32, new_width: u32, new_height: u32) -> FilterType {
    let width_ratio = orig_width as f32 / new_width as f32;
    let height_ratio = orig_height as f32 / new_height as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

/// Render the decoded image onto a surface of the target size.
pub fn render(img: DynamicImage, target: TargetDimensions) -> DynamicImage {
    let (orig_width, orig_height) = img.dimensions();
    if target.is_unchanged_from(orig_width, orig_height) {
        return img;
    }

    let filter = select_filter(orig_width, orig_height, target.width, target.height);
    img.resize_exact(target.width, target.height, filter)
}
