//! File operations for the knowledge base: parse, atomic write, fingerprint, lock.

mod hash;
mod load;
mod lock;
mod save;

pub use hash::{fingerprint_bytes, fingerprint_file};
pub use load::{parse_document, read_document};
pub use lock::{LockOptions, StoreLock};
pub use save::{render_document, write_atomic};
