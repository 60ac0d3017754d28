pub mod cancellation;
pub mod window_stats;

pub use cancellation::CancellationToken;
