pub(crate) mod config;
pub(crate) mod layer;
pub(crate) mod node;
pub(crate) mod params;
pub(crate) mod stage;
pub(crate) mod view;
