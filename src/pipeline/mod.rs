pub mod assemble;
pub mod licenses;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod testing;

pub use licenses::LicenseResolver;
pub use orchestrator::{ReportAssembler, ReportResponse};
