pub mod arc;
pub mod carousel;
pub mod config;
pub mod events;
pub mod input;
pub mod layout;
pub mod scroll;
pub mod tile;
pub mod tasks {
    pub mod library;
}
pub mod render {
    pub mod caption;
    pub mod color;
    pub mod loader;
    pub mod viewer;
}
