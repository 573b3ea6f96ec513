use std::path::PathBuf;

use crate::carousel::GalleryItem;

/// Job for the background media loader thread.
#[derive(Debug)]
pub enum LoaderRequest {
    Media {
        /// Index into the source item list.
        slot: usize,
        /// `None` decodes to the generated placeholder gradient.
        source: Option<PathBuf>,
        max_edge: u32,
    },
    Quit,
}

/// Decoded RGBA8 media ready for GPU upload.
#[derive(Debug)]
pub struct LoadedMedia {
    pub slot: usize,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    /// True when the real media failed and the gradient stood in.
    pub placeholder: bool,
}

/// From the library watch task to the host.
#[derive(Debug)]
pub enum LibraryEvent {
    ItemsChanged(Vec<GalleryItem>),
}

/// User events injected into the winit loop.
#[derive(Debug)]
pub enum HostEvent {
    Cancelled,
    Library(LibraryEvent),
}
