use std::fs;
use std::path::Path;

use secure_config::store::{PASSWORD_OPTION, SALT_OPTION, SECURITY_SECTION, USER_OPTION};
use secure_config::{ConfigStore, SectionTable, StoreError, StoreOptions};
use tempfile::tempdir;

fn secured(path: &Path, user: &str, password: &str) -> Result<ConfigStore, StoreError> {
    ConfigStore::builder()
        .file(path)
        .credentials(user, password)
        .open()
}

#[test]
fn plain_store_saves_empty_file() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("without_security.ini");

    let mut store = ConfigStore::builder().file(&path).open().expect("opens");
    assert!(!store.encryption());
    assert!(store.list_sections().expect("list").is_empty());

    store.save().expect("save");
    let text = fs::read_to_string(&path).expect("file exists");
    assert!(SectionTable::parse(&text, "saved").expect("parses").is_empty());
}

#[test]
fn sections_and_options_persist_across_handles() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("without_security.ini");

    let mut store = ConfigStore::builder().file(&path).open().expect("opens");
    store.add_section("new_section").expect("add");
    store
        .set_option("new_section", "new_option", "some value")
        .expect("set");
    store.save().expect("save");

    let reopened = ConfigStore::builder().file(&path).open().expect("reopens");
    assert!(reopened
        .list_sections()
        .expect("list")
        .contains(&"new_section".to_string()));
    assert_eq!(
        reopened
            .get_option("new_section", "new_option")
            .expect("get"),
        "some value"
    );
    let section = reopened.get_section("new_section").expect("section");
    assert_eq!(section.iter().collect::<Vec<_>>(), vec![("new_option", "some value")]);
}

#[test]
fn credentials_bootstrap_on_new_file() {
    let dir = tempdir().expect("temp dir");
    let store = secured(&dir.path().join("secure.ini"), "alice", "s3cret").expect("opens");

    let section = store.get_section(SECURITY_SECTION).expect("security section");
    for option in [USER_OPTION, PASSWORD_OPTION, SALT_OPTION] {
        assert!(section.contains(option), "missing {option}");
    }
    assert_eq!(
        store.get_option(SECURITY_SECTION, USER_OPTION).expect("user"),
        "alice"
    );
    assert_ne!(
        store
            .get_option(SECURITY_SECTION, PASSWORD_OPTION)
            .expect("digest"),
        "s3cret"
    );
}

#[test]
fn wrong_password_is_rejected_without_side_effects() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("secure.ini");

    let mut store = secured(&path, "alice", "s3cret").expect("opens");
    store.add_section("app").expect("add");
    store.save().expect("save");
    drop(store);
    let on_disk = fs::read(&path).expect("read");

    let mut intruder = secured(&path, "alice", "wrong").expect("construction still loads");
    assert!(matches!(intruder.add_section("x"), Err(StoreError::Authentication)));
    assert!(matches!(
        intruder.set_option("app", "k", "v"),
        Err(StoreError::Authentication)
    ));
    assert!(matches!(intruder.list_sections(), Err(StoreError::Authentication)));
    assert!(matches!(intruder.save(), Err(StoreError::Authentication)));
    assert!(matches!(
        intruder.generate_key(true, false),
        Err(StoreError::Authentication)
    ));
    assert!(!intruder.encryption());
    assert_eq!(fs::read(&path).expect("read"), on_disk);

    let owner = secured(&path, "alice", "s3cret").expect("reopens");
    assert_eq!(
        owner.list_sections().expect("list"),
        vec![SECURITY_SECTION.to_string(), "app".to_string()]
    );
}

#[test]
fn changed_password_does_not_override_stored_digest() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("secure.ini");
    secured(&path, "alice", "s3cret")
        .expect("opens")
        .save()
        .expect("save");

    let store = secured(&path, "alice", "changed").expect("opens");
    assert!(!store.credentials_valid().expect("lookup succeeds"));
}

#[test]
fn reset_credentials_survives_reopen() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("secure.ini");

    let mut store = secured(&path, "alice", "s3cret").expect("opens");
    store.reset_credentials("alice", "rotated").expect("reset");
    store.save().expect("save");

    let old = secured(&path, "alice", "s3cret").expect("opens");
    assert!(matches!(old.list_sections(), Err(StoreError::Authentication)));
    let new = secured(&path, "alice", "rotated").expect("opens");
    assert!(new.list_sections().is_ok());
}

#[test]
fn encrypted_round_trip() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("encrypted.ini");

    let mut store = ConfigStore::builder()
        .file(&path)
        .key(b"k1")
        .open()
        .expect("opens");
    assert!(store.encryption());
    store.add_section("s").expect("add");
    store.set_option("s", "o", "v").expect("set");
    store.save().expect("save");

    let raw = fs::read(&path).expect("read");
    assert!(!raw.windows(3).any(|w| w == b"[s]"));

    let reopened = ConfigStore::builder()
        .file(&path)
        .key(b"k1")
        .open()
        .expect("reopens");
    assert_eq!(reopened.get_option("s", "o").expect("get"), "v");
}

#[test]
fn wrong_key_fails_to_decrypt() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("encrypted.ini");

    let mut store = ConfigStore::builder()
        .file(&path)
        .key(b"k1")
        .encryption(true)
        .open()
        .expect("opens");
    store
        .load_from_mapping([("s", [("o", "v")])], "scenario")
        .expect("load");
    store.save().expect("save");

    let err = ConfigStore::builder()
        .file(&path)
        .key(b"k2")
        .open()
        .unwrap_err();
    assert!(matches!(err, StoreError::Decryption(_)));

    let mut detached = ConfigStore::builder().key(b"k2").open().expect("opens");
    detached.add_section("kept").expect("add");
    assert!(matches!(
        detached.load_path(&path),
        Err(StoreError::Decryption(_))
    ));
    assert_eq!(detached.list_sections().expect("list"), vec!["kept"]);
}

#[test]
fn generated_key_requires_resave() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("rotating.ini");

    let mut store = ConfigStore::builder()
        .file(&path)
        .key(b"k1")
        .open()
        .expect("opens");
    store.add_section("s").expect("add");
    store.save().expect("save");

    let new_key = store.generate_key(true, false).expect("generate");
    assert!(matches!(store.load(), Err(StoreError::Decryption(_))));

    store.save().expect("re-save under new key");
    let reopened = ConfigStore::builder()
        .file(&path)
        .key(new_key.as_slice())
        .open()
        .expect("reopens with new key");
    assert!(reopened.has_section("s").expect("has"));
}

#[test]
fn encrypted_and_secured_store() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("both.ini");
    let key_path = dir.path().join("both.key");
    fs::write(&key_path, "k1\n").expect("write key");

    let options = StoreOptions::from_json_str(&format!(
        r#"{{ "file": {file:?}, "key_path": {key:?}, "user": "alice", "password": "s3cret" }}"#,
        file = path.display().to_string(),
        key = key_path.display().to_string(),
    ))
    .expect("options parse");
    let mut store = ConfigStore::open(options).expect("opens");
    store.add_section("db").expect("add");
    store.save().expect("save");

    let reopened = ConfigStore::builder()
        .file(&path)
        .key("k1")
        .credentials("alice", "s3cret")
        .open()
        .expect("reopens");
    assert!(reopened.has_section("db").expect("has"));
    assert_eq!(
        reopened.get_option(SECURITY_SECTION, USER_OPTION).expect("user"),
        "alice"
    );
}

#[test]
fn missing_section_write_is_dropped() {
    let mut store = ConfigStore::builder().open().expect("opens");
    store
        .set_option("missing_section", "opt", "v")
        .expect("silently ignored");
    assert!(matches!(
        store.get_section("missing_section"),
        Err(StoreError::SectionNotFound(_))
    ));
}

#[test]
fn switching_config_file_loads_existing_content() {
    let dir = tempdir().expect("temp dir");
    let first = dir.path().join("test_setters.ini");
    let second = dir.path().join("other.ini");
    fs::write(&second, "[from_other]\nk = v\n").expect("seed");

    let mut store = ConfigStore::builder().file(&first).open().expect("opens");
    store.save().expect("save");

    store.set_config_file(&second).expect("switch");
    assert_eq!(store.config_file(), Some(second.as_path()));
    assert_eq!(store.get_option("from_other", "k").expect("loaded"), "v");
}

#[test]
fn explicit_load_without_file_is_not_found() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("absent.ini");
    let mut store = ConfigStore::builder().file(&path).open().expect("opens");
    assert!(matches!(store.load(), Err(StoreError::NotFound(_))));
}

#[test]
fn awkward_values_and_names_survive_save_and_reopen() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("p.ini");

    let mut store = ConfigStore::builder().file(&path).open().expect("opens");
    store.add_section("s").expect("add");
    store
        .set_option("s", "motd", "line one\n# not a comment")
        .expect("set");
    store.set_option("s", "pad", "  padded  ").expect("set");
    assert!(matches!(
        store.set_option("s", "a=b", "v"),
        Err(StoreError::InvalidName { .. })
    ));
    store.set_option("s", "k", "v").expect("set");
    assert!(matches!(
        store.set_option("s", "k ", "w"),
        Err(StoreError::InvalidName { .. })
    ));
    store.save().expect("save");

    let reopened = ConfigStore::builder().file(&path).open().expect("reopens");
    let section = reopened.get_section("s").expect("section");
    assert_eq!(
        section.iter().collect::<Vec<_>>(),
        vec![
            ("motd", "line one\n# not a comment"),
            ("pad", "  padded  "),
            ("k", "v"),
        ]
    );
}
