mod overlay;

pub use overlay::overlay_plugin;
