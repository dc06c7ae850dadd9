pub(crate) mod composite;
pub(crate) mod cpu;
pub(crate) mod filter;
pub(crate) mod recording;
pub(crate) mod surface;
