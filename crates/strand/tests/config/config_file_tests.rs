use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use test_log::test;

use strand::{ConfigLoader, ControlError, PartitionId};

const OPERATOR_CONFIG: &str = r#"
replication:
  tick_interval_ms: 250
  invite_timeout_ms: 10000
provisioning:
  creation_timeout_ms: 120000
transport:
  request_timeout_ms: 2500
system_partition_id: 1
"#;

#[test]
fn test_yaml_without_extension_falls_back() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(OPERATOR_CONFIG.as_bytes()).unwrap();

    let config = ConfigLoader::from_path(temp_file.path()).unwrap();

    assert_eq!(config.replication.tick_interval(), Duration::from_millis(250));
    assert_eq!(config.replication.invite_timeout(), Duration::from_secs(10));
    assert_eq!(config.provisioning.creation_timeout(), Duration::from_secs(120));
    assert_eq!(config.provisioning.completion_timeout(), Duration::from_secs(60));
    assert_eq!(config.transport.request_timeout(), Duration::from_millis(2500));
    assert_eq!(config.transport.connect_timeout(), Duration::from_secs(5));
    assert_eq!(config.system_partition_id, PartitionId(1));
    assert_eq!(config.mailbox_capacity, 64);
}

#[test]
fn test_loaded_config_is_validated() {
    let mut temp_file = NamedTempFile::with_suffix(".yml").unwrap();
    temp_file
        .write_all(b"provisioning:\n  tick_interval_ms: 0\n")
        .unwrap();

    match ConfigLoader::from_path(temp_file.path()) {
        Err(ControlError::InvalidConfig { context, .. }) => {
            assert_eq!(context, "provisioning.tick_interval_ms");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_empty_json_object_uses_defaults() {
    let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
    temp_file.write_all(b"{}").unwrap();

    let config = ConfigLoader::from_path(temp_file.path()).unwrap();
    assert_eq!(config, strand::ControlConfig::default());
}
