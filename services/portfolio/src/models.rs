//! Domain models for the portfolio service

pub mod admin;
pub mod image;

pub use admin::Admin;
pub use image::{
    Category, GalleryFilter, ImageRecord, NewImage, Orientation, UploadMetadata, UploadMethod,
};
