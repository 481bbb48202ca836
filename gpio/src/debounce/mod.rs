mod press;

pub use press::*;
