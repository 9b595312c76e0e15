pub mod debounce;
pub mod input;

pub use debounce::debounce;
pub use input::SearchInput;
