//! Create / open / drop / clear for the shadow and metadata tables.
//!
//! These are free functions rather than methods because `create`, `drop`,
//! and the identifier checks they share operate on a `(schema, name)` pair
//! before any [`crate::api::DiskAnnIndex`] handle exists — mirroring the
//! language-neutral entry points elsewhere in this crate, which take `(db, schema, name)`
//! directly rather than a pre-opened handle.

use crate::config::IndexConfig;
use crate::error::DiskAnnError;
use crate::host::Host;
use crate::ident::{metadata_table_name, shadow_table_name, validate_identifier};
use crate::metric::Metric;

const KEY_FORMAT_VERSION: &str = "format_version";
const KEY_DIMENSIONS: &str = "dimensions";
const KEY_METRIC: &str = "metric";
const KEY_MAX_NEIGHBORS: &str = "max_neighbors";
const KEY_SEARCH_LIST_SIZE: &str = "search_list_size";
const KEY_INSERT_LIST_SIZE: &str = "insert_list_size";
const KEY_BLOCK_SIZE: &str = "block_size";
const KEY_PRUNING_ALPHA_X1000: &str = "pruning_alpha_x1000";

/// Creates the shadow and metadata tables for a new index and persists
/// `config`.
///
/// `schema` is accepted and validated but is not otherwise used by
/// this crate's `Host` abstraction, which addresses one database at a time;
/// a multi-schema host binding would thread it into the table-qualification
/// step instead.
///
/// # Errors
///
/// Returns [`DiskAnnError::Invalid`] for a malformed `schema`/`name`, or one
/// lacking `config` (dimensionality cannot be inferred — see `DESIGN.md`),
/// [`DiskAnnError::Exists`] if the shadow table is already present, or a
/// host I/O error.
pub fn create<H: Host>(
    host: &H,
    schema: &str,
    name: &str,
    config: Option<IndexConfig>,
) -> Result<(), DiskAnnError> {
    validate_identifier(schema)?;
    validate_identifier(name)?;

    let shadow = shadow_table_name(name);
    if host.table_exists(&shadow)? {
        return Err(DiskAnnError::Exists(format!("index {name:?} already exists")));
    }

    let config = config.ok_or_else(|| {
        DiskAnnError::Invalid("create requires a config; dimensions cannot be inferred".into())
    })?;

    let metadata = metadata_table_name(name);
    host.create_shadow_table(&shadow)?;
    host.create_metadata_table(&metadata)?;

    host.metadata_set(&metadata, KEY_FORMAT_VERSION, i64::from(config.format_version))?;
    host.metadata_set(&metadata, KEY_DIMENSIONS, i64::from(config.dimensions))?;
    host.metadata_set(&metadata, KEY_METRIC, i64::from(config.metric.tag()))?;
    host.metadata_set(&metadata, KEY_MAX_NEIGHBORS, i64::from(config.max_neighbors))?;
    host.metadata_set(&metadata, KEY_SEARCH_LIST_SIZE, i64::from(config.search_list_size))?;
    host.metadata_set(&metadata, KEY_INSERT_LIST_SIZE, i64::from(config.insert_list_size))?;
    host.metadata_set(&metadata, KEY_BLOCK_SIZE, i64::from(config.block_size))?;
    host.metadata_set(&metadata, KEY_PRUNING_ALPHA_X1000, i64::from(config.pruning_alpha_x1000))?;

    Ok(())
}

/// Loads an existing index's configuration from its metadata table.
///
/// # Errors
///
/// Returns [`DiskAnnError::NotFound`] if the shadow table is absent,
/// [`DiskAnnError::Version`] if the stored `format_version` exceeds what
/// this build supports, [`DiskAnnError::Invalid`] if a required metadata
/// key is missing or a stored metric tag is unrecognized, or a host I/O
/// error.
pub fn open_config<H: Host>(host: &H, schema: &str, name: &str) -> Result<IndexConfig, DiskAnnError> {
    validate_identifier(schema)?;
    validate_identifier(name)?;

    let shadow = shadow_table_name(name);
    if !host.table_exists(&shadow)? {
        return Err(DiskAnnError::NotFound(format!("index {name:?} does not exist")));
    }
    let metadata = metadata_table_name(name);

    let format_version = required_u32(host, &metadata, KEY_FORMAT_VERSION)?;
    if format_version > crate::config::SUPPORTED_FORMAT_VERSION {
        return Err(DiskAnnError::Version {
            stored: format_version,
            supported: crate::config::SUPPORTED_FORMAT_VERSION,
        });
    }

    let dimensions = required_u32(host, &metadata, KEY_DIMENSIONS)?;
    let metric_tag = required_u32(host, &metadata, KEY_METRIC)?;
    let metric = Metric::from_tag(metric_tag)
        .ok_or_else(|| DiskAnnError::Invalid(format!("unrecognized metric tag {metric_tag}")))?;
    let max_neighbors = required_u32(host, &metadata, KEY_MAX_NEIGHBORS)?;
    let search_list_size = required_u32(host, &metadata, KEY_SEARCH_LIST_SIZE)?;
    let insert_list_size = required_u32(host, &metadata, KEY_INSERT_LIST_SIZE)?;
    let block_size = required_u32(host, &metadata, KEY_BLOCK_SIZE)?;
    let pruning_alpha_x1000 = required_u32(host, &metadata, KEY_PRUNING_ALPHA_X1000)?;

    Ok(IndexConfig {
        format_version,
        dimensions,
        metric,
        max_neighbors,
        search_list_size,
        insert_list_size,
        block_size,
        pruning_alpha_x1000,
    })
}

fn required_u32<H: Host>(host: &H, table: &str, key: &str) -> Result<u32, DiskAnnError> {
    host.metadata_get(table, key)?
        .map(|v| v as u32)
        .ok_or_else(|| DiskAnnError::Invalid(format!("metadata key {key:?} missing from {table:?}")))
}

/// Drops `{name}_shadow` and `{name}_metadata` if present.
///
/// An out-of-scope vtab wrapper layer may own further sidecar tables
/// under its own naming convention; this crate only knows about — and only
/// drops — the two tables it itself created.
///
/// # Errors
///
/// Returns [`DiskAnnError::Invalid`] for a malformed `schema`/`name`, or a
/// host I/O error.
pub fn drop_index<H: Host>(host: &H, schema: &str, name: &str) -> Result<(), DiskAnnError> {
    validate_identifier(schema)?;
    validate_identifier(name)?;
    host.drop_table_if_exists(&shadow_table_name(name))?;
    host.drop_table_if_exists(&metadata_table_name(name))?;
    Ok(())
}

/// Deletes every row from `{name}_shadow`, preserving the table and all
/// metadata.
///
/// # Errors
///
/// Returns a host I/O error if the delete fails.
pub fn clear<H: Host>(host: &H, shadow_table: &str) -> Result<(), DiskAnnError> {
    host.clear_table(shadow_table)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RusqliteHost;

    fn cfg(dims: u32) -> IndexConfig {
        IndexConfig::new(dims, Metric::L2).unwrap()
    }

    #[test]
    fn create_then_open_round_trips_config() {
        let host = RusqliteHost::open_in_memory().unwrap();
        create(&host, "main", "idx", Some(cfg(8))).unwrap();
        let loaded = open_config(&host, "main", "idx").unwrap();
        assert_eq!(loaded, cfg(8));
    }

    #[test]
    fn create_twice_is_exists_error() {
        let host = RusqliteHost::open_in_memory().unwrap();
        create(&host, "main", "idx", Some(cfg(8))).unwrap();
        let err = create(&host, "main", "idx", Some(cfg(8))).unwrap_err();
        assert!(matches!(err, DiskAnnError::Exists(_)));
    }

    #[test]
    fn open_missing_index_is_not_found() {
        let host = RusqliteHost::open_in_memory().unwrap();
        let err = open_config(&host, "main", "missing").unwrap_err();
        assert!(matches!(err, DiskAnnError::NotFound(_)));
    }

    #[test]
    fn open_rejects_newer_format_version() {
        let host = RusqliteHost::open_in_memory().unwrap();
        create(&host, "main", "idx", Some(cfg(8))).unwrap();
        host.metadata_set(&metadata_table_name("idx"), KEY_FORMAT_VERSION, 999).unwrap();
        let err = open_config(&host, "main", "idx").unwrap_err();
        assert!(matches!(err, DiskAnnError::Version { .. }));
    }

    #[test]
    fn create_without_config_is_invalid() {
        let host = RusqliteHost::open_in_memory().unwrap();
        let err = create(&host, "main", "idx", None).unwrap_err();
        assert!(matches!(err, DiskAnnError::Invalid(_)));
    }

    #[test]
    fn drop_removes_both_tables() {
        let host = RusqliteHost::open_in_memory().unwrap();
        create(&host, "main", "idx", Some(cfg(8))).unwrap();
        drop_index(&host, "main", "idx").unwrap();
        assert!(!host.table_exists(&shadow_table_name("idx")).unwrap());
        assert!(!host.table_exists(&metadata_table_name("idx")).unwrap());
    }

    #[test]
    fn clear_preserves_metadata_but_empties_shadow() {
        let host = RusqliteHost::open_in_memory().unwrap();
        create(&host, "main", "idx", Some(cfg(8))).unwrap();
        let shadow = shadow_table_name("idx");
        host.insert_zero_row(&shadow, 1, 4096).unwrap();
        clear(&host, &shadow).unwrap();
        assert_eq!(host.random_row_id(&shadow).unwrap(), None);
        assert!(open_config(&host, "main", "idx").is_ok());
    }

    #[test]
    fn rejects_invalid_identifier() {
        let host = RusqliteHost::open_in_memory().unwrap();
        let err = create(&host, "main", "bad name", Some(cfg(8))).unwrap_err();
        assert!(matches!(err, DiskAnnError::Invalid(_)));
    }
}
