//! Shared infrastructure utilities for the hardware database.
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename), used for
//!   the database file and the generated license files.

pub mod atomic_write;

pub use atomic_write::{
    AtomicWriteOptions, FileSyncPolicy, ParentDirSyncPolicy, PersistMode, atomic_write,
    atomic_write_with_options, recover_bak_file,
};
