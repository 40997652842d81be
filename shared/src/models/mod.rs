//! Domain models for the Larder cost-accounting platform

mod ingredient;
mod matching;
mod procurement;
mod recipe;
mod sales;
mod stock;
mod variance;

pub use ingredient::*;
pub use matching::*;
pub use procurement::*;
pub use recipe::*;
pub use sales::*;
pub use stock::*;
pub use variance::*;
