pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};
pub use itertools::Itertools;
#[allow(unused_imports)]
pub use log::{debug, error, info, trace, warn};
