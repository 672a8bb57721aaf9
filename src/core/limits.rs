/*!
 * System Limits and Constants
 *
 * Centralized location for kernel-wide limits, thresholds, and defaults.
 * Organized by domain.
 */

use std::time::Duration;

// =============================================================================
// VFS
// =============================================================================

/// Default maximum upload/write size for remote transports (0 = unlimited)
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 0;

/// Local storage quota (5MB, as in browsers)
pub const LOCAL_STORAGE_QUOTA: u64 = 5 * 1024 * 1024;

/// Requests slower than this are logged as warnings
pub const SLOW_VFS_REQUEST: Duration = Duration::from_millis(500);

/// Timeout for a single remote request
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pseudo mime type of application entries
pub const APPLICATION_MIME: &str = "osjs/application";

/// Root of the applications mount
pub const APPLICATIONS_ROOT: &str = "applications:///";

// =============================================================================
// EVENTS
// =============================================================================

/// Buffered lifecycle events per subscriber before lagging
pub const LIFECYCLE_EVENT_CAPACITY: usize = 256;

// =============================================================================
// NETWORK
// =============================================================================

/// Default endpoint of the server API
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000/API";

/// Default endpoint files are served from
pub const DEFAULT_FS_URI: &str = "http://localhost:8000/FS";
