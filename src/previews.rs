use image::DynamicImage;
use rayon::prelude::*;

use crate::catalog::{FilterId, chain_for};
use crate::error::EditError;
use crate::processing::RenderEngine;

pub const THUMB_SIZE: u32 = 300;

pub type Preview = (FilterId, Result<DynamicImage, EditError>);

/// Renders one thumbnail per catalog filter, in catalog order.
pub fn render_previews(image: &DynamicImage, size: u32, engine: &dyn RenderEngine) -> Vec<Preview> {
    let size = size.max(1);
    let thumb = if image.width() > size || image.height() > size {
        image.thumbnail(size, size)
    } else {
        image.clone()
    };

    FilterId::ALL
        .par_iter()
        .map(|&id| {
            let result = engine.render(&thumb, &chain_for(id));
            if let Err(err) = &result {
                tracing::warn!(filter = %id, error = %err, "preview render failed");
            }
            (id, result)
        })
        .collect()
}
