pub mod conversion;

pub use conversion::{biguint_to_string, normalize_address, parse_biguint};
