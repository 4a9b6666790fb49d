//! Command handlers for the Attest CLI.

pub mod ask;
pub mod catalog;
pub mod index;
pub mod pipeline;
pub mod run;

pub use ask::AskCommand;
pub use catalog::CatalogCommand;
pub use index::IndexCommand;
pub use run::RunCommand;
