pub mod initializer;

pub use initializer::{
    HeInitializer, InitializerType, RandomInitializer, WeightInitializer, XavierInitializer,
};
