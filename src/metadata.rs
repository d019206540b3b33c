use crate::constant::{ColumnFlags, ColumnType, ProtocolFieldType, compute_column_type};

/// Whether column definitions keep their string fields.
///
/// `Minimal` drops everything not needed to decode rows; `Full` retains the
/// complete definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataMode {
    #[default]
    Minimal,
    Full,
}

/// Metadata for a single column of a resultset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub(crate) schema: String,
    pub(crate) table: String,
    pub(crate) org_table: String,
    pub(crate) name: String,
    pub(crate) org_name: String,
    pub(crate) charset: u16,
    pub(crate) column_length: u32,
    pub(crate) protocol_type: ProtocolFieldType,
    pub(crate) flags: ColumnFlags,
    pub(crate) decimals: u8,
}

impl ColumnMetadata {
    /// Database the column belongs to. Empty in minimal metadata mode.
    pub fn database(&self) -> &str {
        &self.schema
    }

    /// Table name as used in the query (alias-aware). Empty in minimal mode.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Physical table name. Empty in minimal mode.
    pub fn original_table(&self) -> &str {
        &self.org_table
    }

    /// Column name as used in the query (alias-aware). Empty in minimal mode.
    pub fn column_name(&self) -> &str {
        &self.name
    }

    /// Physical column name. Empty in minimal mode.
    pub fn original_column_name(&self) -> &str {
        &self.org_name
    }

    /// Collation id of the column.
    pub fn charset(&self) -> u16 {
        self.charset
    }

    /// Declared maximum length of the column.
    pub fn column_length(&self) -> u32 {
        self.column_length
    }

    /// Declared number of decimal digits (fractional-second precision for
    /// temporal columns).
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// The coarse column type derived from the wire triple.
    pub fn column_type(&self) -> ColumnType {
        compute_column_type(self.protocol_type, self.flags, self.charset)
    }

    pub(crate) fn protocol_type(&self) -> ProtocolFieldType {
        self.protocol_type
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(ColumnFlags::UNSIGNED_FLAG)
    }

    pub fn is_not_null(&self) -> bool {
        self.flags.contains(ColumnFlags::NOT_NULL_FLAG)
    }

    pub fn is_primary_key(&self) -> bool {
        self.flags.contains(ColumnFlags::PRI_KEY_FLAG)
    }

    pub fn is_unique_key(&self) -> bool {
        self.flags.contains(ColumnFlags::UNIQUE_KEY_FLAG)
    }

    pub fn is_multiple_key(&self) -> bool {
        self.flags.contains(ColumnFlags::MULTIPLE_KEY_FLAG)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.flags.contains(ColumnFlags::AUTO_INCREMENT_FLAG)
    }

    pub fn is_zerofill(&self) -> bool {
        self.flags.contains(ColumnFlags::ZEROFILL_FLAG)
    }

    pub fn has_no_default_value(&self) -> bool {
        self.flags.contains(ColumnFlags::NO_DEFAULT_VALUE_FLAG)
    }

    pub fn is_set_to_now_on_update(&self) -> bool {
        self.flags.contains(ColumnFlags::ON_UPDATE_NOW_FLAG)
    }
}
