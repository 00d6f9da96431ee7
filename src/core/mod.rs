//! Core data model for firmware module tracking.
//!
//! [`Address`] is the foundation for every location the model records;
//! [`Module`] describes one firmware binary and [`ModuleTable`] holds the set
//! of modules of a firmware image.

pub mod address;
pub mod address_range;
pub mod module;
pub mod record;
pub mod report;
pub mod table;

pub use address::Address;
pub use address_range::AddressRange;
pub use module::Module;
pub use record::ModuleRecord;
pub use report::BatchReport;
pub use table::{ModuleTable, RenderOptions};
