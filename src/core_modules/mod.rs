pub mod blob_detector;
pub mod difference;
pub mod frame;
pub mod geometry;
pub mod morphology;
pub mod pixel;
pub mod refiner;
pub mod sampler;
pub mod smart_blob;
pub mod threshold;

pub mod utils {
    pub mod image_helper;
}
