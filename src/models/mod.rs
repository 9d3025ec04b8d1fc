mod fill;

pub use fill::{notional, underlying, Fill, TakerSide, PRODUCT_SUFFIX_LEN};
