/// Default configuration constants used across the system.

/// Default chain identifier.
pub const DEFAULT_CHAIN_ID: u64 = 134;

/// Default compute category.
pub const DEFAULT_CATEGORY: u32 = 0;

/// Default price ceiling per execution, in the smallest currency unit.
pub const DEFAULT_PRICE_CEILING: u64 = 0;

/// Capability tag every run must request.
pub const TRUSTED_EXECUTION_TAG: &str = "tee";

/// Default capability tags.
pub const DEFAULT_TAGS: &[&str] = &["tee", "scone"];

/// Default store label for the provisioned secret.
pub const DEFAULT_SECRET_LABEL: &str = "1";

/// Default consumer argument string (digest-only response).
pub const DEFAULT_CONSUMER_ARGS: &str = "hash";

/// Name of the JSON member inside a result archive.
pub const RESULT_MEMBER: &str = "result.json";

/// Fingerprint record file name, inside the state directory.
pub const FINGERPRINT_FILE: &str = "secret-fingerprint.json";

/// State directory name under the home directory.
pub const STATE_DIR_NAME: &str = ".secretproof";

/// Default settling delay before the first status poll (10 seconds).
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 10_000;

/// Default first poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Default cap on the poll interval.
pub const DEFAULT_POLL_MAX_INTERVAL_MS: u64 = 30_000;

/// Default poll backoff factor.
pub const DEFAULT_POLL_BACKOFF_FACTOR: f64 = 1.5;

/// Accepted range for the poll backoff factor.
pub const POLL_BACKOFF_FACTOR_RANGE: std::ops::RangeInclusive<f64> = 1.0..=10.0;

/// Default wait budget per execution (15 minutes).
pub const DEFAULT_MAX_WAIT_MS: u64 = 15 * 60_000;

/// Maximum size for a config file (1 MB).
pub const MAX_CONFIG_FILE_BYTES: u64 = 1024 * 1024;

/// Maximum size of a downloaded result archive (16 MB).
pub const MAX_RESULT_ARCHIVE_BYTES: u64 = 16 * 1024 * 1024;

/// Maximum uncompressed size of the result document inside an archive (1 MB).
pub const MAX_RESULT_MEMBER_BYTES: u64 = 1024 * 1024;
