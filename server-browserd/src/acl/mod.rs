pub mod range;
pub mod store;

pub use range::NetworkRange;
pub use store::NetworkRangeStore;

/// Entries shown in log lines before the rest are summarized.
const LOGGED_ENTRIES: usize = 10;

/// Comma-separated entries for logging, truncated after the first few.
pub fn summarize<S: AsRef<str>>(entries: &[S]) -> String {
    let mut summary = entries
        .iter()
        .take(LOGGED_ENTRIES)
        .map(|e| e.as_ref())
        .collect::<Vec<_>>()
        .join(", ");

    if entries.len() > LOGGED_ENTRIES {
        summary.push_str(&format!(" (and {} more)", entries.len() - LOGGED_ENTRIES));
    }
    summary
}
