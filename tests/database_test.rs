//! Store behaviour against a file-backed database

use tempfile::NamedTempFile;

use tinyapp::database::{init_db, Store};

#[test]
fn test_file_backed_store_survives_reopen() {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp_db.path().to_str().unwrap();

    let (url, user) = {
        let store = Store::new(init_db(Some(path)).unwrap(), 6);
        let user = store.create_user("ren", "ren@example.com", "hash").unwrap();
        let url = store.create_url("https://example.com", &user.id).unwrap();
        (url, user)
    };

    let store = Store::new(init_db(Some(path)).unwrap(), 6);
    assert_eq!(store.get_url(&url.short_url).unwrap(), Some(url.clone()));
    assert_eq!(store.find_user_by_email("ren@example.com").unwrap(), Some(user.clone()));
    assert_eq!(store.urls_for_owner(&user.id).unwrap(), vec![url]);
}

#[test]
fn test_in_memory_stores_are_independent() {
    let first = Store::in_memory(6).unwrap();
    let second = Store::in_memory(6).unwrap();

    first.create_url("https://example.com", "owner1").unwrap();
    assert_eq!(first.all_urls().unwrap().len(), 1);
    assert!(second.all_urls().unwrap().is_empty());
}
