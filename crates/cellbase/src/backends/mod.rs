pub mod local;
pub mod memory;
pub mod remote;

pub use local::{LocalSheet, LocalWorkbook};
pub use memory::{CallLog, MemorySpreadsheet, MemoryWorksheet};
pub use remote::{RemoteSheet, RemoteWorkbook};
