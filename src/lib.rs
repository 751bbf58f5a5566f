//! # safethumb
//!
//! Thumbnails and exact-size crops from untrusted image bytes.
//!
//! Callers hand over a byte blob and a target size; they get back encoded
//! bytes or one of a small, closed set of errors. Everything between is
//! fenced: only allow-listed formats are parsed, dimensions are bounds-checked
//! before any pixel work, and every decoded buffer is released on every path.
//!
//! # Pipeline
//!
//! ```text
//! bytes ─▶ detect ─▶ parse header ─▶ bounds check ─▶ orientation
//!                                                         │
//!          encoded ◀─ serialize ◀─ crop ◀─ resize ◀─ decode (shrink-on-load)
//! ```
//!
//! The first four steps are cheap and reject hostile input early. Decoding
//! happens only once the target geometry is known, so the backend can shrink
//! while it decodes instead of materializing the full image.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`context`] | Explicit initialization, worker scopes, batch pool, `Metadata` |
//! | [`imager`] | Load-validate-render orchestration and the public [`Error`] set |
//! | [`imaging`] | Format detection, orientation, geometry, backend traits, `image` crate backend |
//! | [`config`] | `safethumb.toml` loading and validation |
//!
//! # Design Decisions
//!
//! ## Ownership Is Lifetime
//!
//! A loaded image is a value. Rendering consumes it and closing consumes it,
//! so "use after close" and "close twice" do not compile. In-progress results
//! release their buffers in `Drop`, which covers early returns on error.
//!
//! ## One Call, One Thread
//!
//! The backend is told once, in [`Context::new`], to use a single thread per
//! call and to keep no cross-call cache. Each call runs inside a
//! [`context::Worker`] guard that flushes per-thread state when the call ends.
//! Parallelism comes from running independent calls side by side
//! ([`Context::thumbnail_batch`]), never from threads inside one call.
//!
//! ## Opaque Errors
//!
//! Backend messages can describe attacker-supplied content. They are logged
//! through `tracing` at debug level and collapsed into [`Error`] before they
//! reach the caller.

pub mod config;
pub mod context;
pub mod imager;
pub mod imaging;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::Config;
pub use context::{Context, InitError, Metadata};
pub use imager::Error;
pub use imaging::{Format, Options, Orientation, Quality, RustBackend};
