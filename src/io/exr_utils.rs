/* Copyright 2020 @TwoCookingMice */

use crate::math::bitmap::Bitmap;
use crate::math::constants::Float;

use exr::prelude::*;

use std::io::Cursor;

// Write EXR Image to file
pub fn write_exr_to_file(image: &std::vec::Vec<(Float, Float, Float)>,
                         width: usize,
                         height: usize,
                         file_path: &str) {
    log::info!("Starting writing openexr images: {}.", file_path);

    let write_result = write_rgb_file(file_path, width, height, |x,y| {
        (
            image[y*width+x].0,
            image[y*width+x].1,
            image[y*width+x].2
        )
    });
    match write_result {
        Ok(()) => log::info!("EXR written to: {}.", file_path),
        Err(e) => log::warn!("EXR written error: {}.", e.to_string())
    }
}

// Encode a bitmap into an in-memory EXR byte buffer for wire transfer.
pub fn encode_exr_to_memory(bitmap: &Bitmap) -> std::result::Result<Vec<u8>, Error> {
    let width = bitmap.width();
    let height = bitmap.height();

    let channels = SpecificChannels::rgb(|pos: Vec2<usize>| {
        let pixel = bitmap[(pos.x(), pos.y())];
        (pixel.x, pixel.y, pixel.z)
    });

    let mut cursor = Cursor::new(Vec::new());
    Image::from_channels((width, height), channels)
        .write()
        .to_buffered(&mut cursor)?;

    Ok(cursor.into_inner())
}
