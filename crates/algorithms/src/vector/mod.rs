//! Raster to vector conversion

mod polygonize;

pub use polygonize::polygonize;
