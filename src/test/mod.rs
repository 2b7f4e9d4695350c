mod employees;
mod seed;
pub mod utils;

pub use utils::test_utils;
