//! Identity strings for database tables and columns.
//!
//! Lineage tooling correlates assets by a lowercase identity derived from
//! the host / connector / schema chain:
//!
//! ```text
//! table:  _ngo:table:_ngo:db:<host>::<connector>::<creationTool>::<schema>::<table>
//! column: _ngo:<column>::_ngo:db:<host>::<connector>::<creationTool>::<schema>::<table>
//! ```

use crate::flow::FlowDocument;
use catalogx_common::{Error, Result};

const TABLE_PREFIX: &str = "_ngo:table:";
const DB_PREFIX: &str = "_ngo:db:";
const COLUMN_PREFIX: &str = "_ngo:";
const SEPARATOR: &str = "::";

/// Column identity derived from an already computed table identity.
pub fn column_identity_from_table_identity(column_name: &str, table_identity: &str) -> String {
    format!(
        "{}{}{}",
        COLUMN_PREFIX,
        column_name.to_lowercase(),
        table_identity.replacen(TABLE_PREFIX, SEPARATOR, 1)
    )
}

impl FlowDocument {
    /// Identity of table `table_name` whose parent schema has flow XML ID
    /// `schema_id`. Walks schema, connector and host; every link and the
    /// connector's `creationTool` attribute must be present.
    pub fn table_identity(&self, table_name: &str, schema_id: &str) -> Result<String> {
        let schema = self.require_asset(schema_id)?;
        let schema_name = self.asset_name(schema)?;

        let connector = self.require_asset(self.parent_asset_id(schema)?)?;
        let connector_name = self.asset_name(connector)?;
        let creation_tool = self
            .asset_attribute(connector, "creationTool")
            .ok_or_else(|| Error::NotFound(format!("creationTool on connector '{}'", connector_name)))?;

        let host = self.require_asset(self.parent_asset_id(connector)?)?;
        let host_name = self.asset_name(host)?;

        let parts = [host_name, connector_name, creation_tool, schema_name, table_name];
        let joined = parts
            .iter()
            .map(|p| p.to_lowercase())
            .collect::<Vec<_>>()
            .join(SEPARATOR);
        Ok(format!("{}{}{}", TABLE_PREFIX, DB_PREFIX, joined))
    }

    /// Identity of column `column_name` whose parent table has flow XML ID
    /// `table_id`.
    pub fn column_identity(&self, column_name: &str, table_id: &str) -> Result<String> {
        let table = self.require_asset(table_id)?;
        let table_name = self.asset_name(table)?;
        let schema_id = self.parent_asset_id(table)?;
        let table_identity = self.table_identity(table_name, schema_id)?;
        Ok(column_identity_from_table_identity(column_name, &table_identity))
    }
}
