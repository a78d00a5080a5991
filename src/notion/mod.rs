//! Notion: the document service pages are published to.
//!
//! [`DocumentService`] is the seam the publisher and the schema initialiser
//! talk through; [`NotionClient`] is the REST implementation. The rest of the
//! module is pure mapping from resolved sections to Notion's JSON vocabulary.

pub mod blocks;
pub mod client;
pub mod markdown;
pub mod properties;

pub use blocks::{Annotations, Block, RichText};
pub use client::NotionClient;
pub use markdown::{markdown_to_blocks, parse_inline};
pub use properties::{build_properties, PageProperties};

use crate::error::DocumentServiceError;
use crate::sections::SectionKind;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Page and schema operations against a Notion-like database.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Create a page in `database_id` with `children` as its initial body.
    ///
    /// # Returns
    /// The new page's id.
    async fn create_page(
        &self,
        database_id: &str,
        properties: &PageProperties,
        children: &[Block],
    ) -> Result<String, DocumentServiceError>;

    /// Append `children` to the end of a page body.
    async fn append_blocks(&self, page_id: &str, children: &[Block]) -> Result<(), DocumentServiceError>;

    /// Existing columns as property name → Notion type name.
    async fn database_properties(
        &self,
        database_id: &str,
    ) -> Result<BTreeMap<String, String>, DocumentServiceError>;

    /// Add a column typed after `kind`.
    async fn add_database_property(
        &self,
        database_id: &str,
        name: &str,
        kind: SectionKind,
    ) -> Result<(), DocumentServiceError>;
}
