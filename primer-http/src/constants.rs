//! Header names and defaults used when talking to the Primer backend.

/// Header carrying the client token's access token.
pub const CLIENT_TOKEN_HEADER: &str = "Primer-Client-Token";

/// Header carrying the backend API version.
pub const API_VERSION_HEADER: &str = "X-Api-Version";

/// Header carrying the SDK version.
pub const SDK_VERSION_HEADER: &str = "Primer-SDK-Version";

/// API version sent unless overridden.
pub const DEFAULT_API_VERSION: &str = "2.3";

/// Version reported in [`SDK_VERSION_HEADER`].
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
