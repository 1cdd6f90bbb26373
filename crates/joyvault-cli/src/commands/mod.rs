pub mod decode;
pub mod derive;
pub mod tiers;
pub mod validate;
