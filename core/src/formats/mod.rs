pub mod log;
pub(crate) mod util;
