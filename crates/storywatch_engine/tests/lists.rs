use std::fs;

use storywatch_engine::{load_account_list, ListError};
use tempfile::TempDir;

#[test]
fn reads_and_filters_account_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("targets.txt");
    fs::write(&path, "\n# c\nalice\n  bob  \n").unwrap();

    assert_eq!(load_account_list(&path).unwrap(), vec!["alice", "bob"]);
}

#[test]
fn missing_file_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    let err = load_account_list(&temp.path().join("notify_users.txt")).unwrap_err();
    assert!(matches!(err, ListError::NotFound(_)));
    assert!(err.kind().is_fatal());
}
