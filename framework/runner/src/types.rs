/// Recommended error type for code built on top of the runner. This type is what every fallible
/// operation in this crate returns, so you can use `?` to propagate errors.
pub type SurgeResult<T> = anyhow::Result<T>;
