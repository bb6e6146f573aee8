/// Router Module Index
///
/// Routes are split by access level so that the authentication layer is
/// applied at the module boundary rather than handler by handler.

/// Routes open to anonymous clients.
pub mod public;

/// Routes behind the `Session` extractor middleware.
pub mod authenticated;
