//! Core domain logic for the hardware database.
//!
//! - **`store`**: the in-memory [`Database`] with referential integrity
//! - **`licenses`**: scheduler license derivation and license file output
//! - **`query`**: single-attribute reads by coordinate, for the CLI

mod error;
pub mod licenses;
pub mod query;
pub mod store;

pub use error::StoreError;
pub use licenses::{
    LicenseStrings, MULTI_CHIP_WAFER_THRESHOLD, generate_license_strings, license_tokens,
    write_license_files,
};
pub use query::{EntryRef, QueryError};
pub use store::{
    Adcs, AnanasBoards, Database, DlsSetups, EditInPlace, EntryKind, Fpgas, HXCubeSetups, Hicanns,
    JboaSetups, Reticles, Wafers,
};
