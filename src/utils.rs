use std::path::Path;
use std::time::Instant;

pub type Result<T> = anyhow::Result<T>;
pub type EmptyRes = Result<()>;

/// Bails out of the current function with a formatted error, in tail position.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Err(anyhow::anyhow!($($arg)*))
    };
}

/// Bails unless the condition holds.
#[macro_export]
macro_rules! require {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            anyhow::bail!($($arg)*);
        }
    };
}

/// Runs `f`, passing its result and elapsed milliseconds to `log`, then returns the result.
pub fn measure<T, F: FnOnce() -> T, L: FnOnce(&T, u128)>(f: F, log: L) -> T {
    let started_at = Instant::now();
    let result = f();
    let elapsed_ms = started_at.elapsed().as_millis();
    log(&result, elapsed_ms);
    result
}

pub fn path_to_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| anyhow::anyhow!("Path is not valid UTF-8: {}", path.display()))
}

pub fn path_file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("Path has no file name: {}", path.display()))
}

pub fn ensure_file_presence(path: &Path) -> Result<&str> {
    let path_str = path_to_str(path)?;
    require!(path.exists(), "File not found: {}", path_str);
    Ok(path_str)
}

/// Clamped slice: like `slice[start..end]`, but out-of-range bounds are clamped rather than panicking.
pub fn cutout<T: Clone>(slice: &[T], start_inc: i64, end_exc: i64) -> Vec<T> {
    fn sanitize<T>(idx: i64, slice: &[T]) -> usize {
        idx.max(0).min(slice.len() as i64) as usize
    }
    let start = sanitize(start_inc, slice);
    let end = sanitize(end_exc, slice);
    if start >= end { vec![] } else { slice[start..end].to_vec() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutout_clamps_bounds() {
        let v = vec![1, 2, 3, 4, 5];
        assert_eq!(cutout(&v, -10, 2), vec![1, 2]);
        assert_eq!(cutout(&v, 3, 100), vec![4, 5]);
        assert_eq!(cutout(&v, 10, 20), Vec::<i32>::new());
    }

    #[test]
    fn measure_returns_inner_result() {
        let mut logged_ms: Option<u128> = None;
        let result = measure(|| 2 + 2, |_, ms| logged_ms = Some(ms));
        assert_eq!(result, 4);
        assert!(logged_ms.is_some());
    }
}
