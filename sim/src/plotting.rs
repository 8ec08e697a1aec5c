//! PNG export of raster previews.

use beliefraster::visualize::PreviewImage;
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

/// Write `image` as a PNG with each cell drawn as a `scale x scale` block.
///
/// Row 0 of the raster is the lowest y bin, so rows are flipped to put +y up.
pub fn write_preview(image: &PreviewImage, path: &Path, scale: u32) -> Result<(), Box<dyn Error>> {
    let scale = scale.max(1);
    let width = image.width as u32 * scale;
    let height = image.height as u32 * scale;
    if width == 0 || height == 0 {
        return Err("cannot render an empty raster".into());
    }
    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&BLACK)?;

    let s = scale as i32;
    for row in 0..image.height {
        let y0 = (image.height - 1 - row) as i32 * s;
        for col in 0..image.width {
            let [r, g, b] = image.pixels[row * image.width + col];
            let x0 = col as i32 * s;
            root.draw(&Rectangle::new(
                [(x0, y0), (x0 + s, y0 + s)],
                RGBColor(r, g, b).filled(),
            ))?;
        }
    }
    root.present()?;
    Ok(())
}
