//! `ctx!` turns an error into an `anyhow::Error` with a formatted
//! context message, for use with `map_err`:
//! `.map_err(ctx!("reading file {path:?}"))` instead of
//! `.with_context(|| anyhow!("reading file {path:?}"))`.

#[macro_export]
macro_rules! ctx {
    ($($fmt:tt)*) => {
        |e| anyhow::Error::from(e).context(format!($($fmt)*))
    };
}
