use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use datamart_client::error::DatamartError;
use datamart_client::session::{
    AUTH_FLAG_KEY, AuthState, SessionGate, StaticIdentityProvider, USER_KEY,
};
use datamart_client::store::{FileStore, KeyValueStore};

fn file_store(temp: &tempfile::TempDir) -> FileStore {
    let root = Utf8PathBuf::from_path_buf(temp.path().join("datamart")).unwrap();
    FileStore::new_with_root(root)
}

#[test]
fn login_survives_process_restart() {
    let temp = tempfile::tempdir().unwrap();
    {
        let mut gate = SessionGate::new(file_store(&temp), StaticIdentityProvider);
        gate.rehydrate().unwrap();
        gate.login("admin", "admin").unwrap();
    }

    let mut gate = SessionGate::new(file_store(&temp), StaticIdentityProvider);
    gate.rehydrate().unwrap();
    assert!(gate.is_authenticated());
    assert_eq!(gate.current_user().unwrap().name, "Administrator");
}

#[test]
fn logout_leaves_no_stale_session_on_disk() {
    let temp = tempfile::tempdir().unwrap();
    {
        let mut gate = SessionGate::new(file_store(&temp), StaticIdentityProvider);
        gate.rehydrate().unwrap();
        gate.login("admin", "admin").unwrap();
        gate.logout().unwrap();
    }

    let store = file_store(&temp);
    assert_eq!(store.get(AUTH_FLAG_KEY).unwrap(), None);
    assert_eq!(store.get(USER_KEY).unwrap(), None);

    let mut gate = SessionGate::new(store, StaticIdentityProvider);
    gate.rehydrate().unwrap();
    assert_eq!(*gate.state(), AuthState::Unauthenticated);
}

#[test]
fn rejected_credentials_never_touch_the_store() {
    let temp = tempfile::tempdir().unwrap();
    let mut gate = SessionGate::new(file_store(&temp), StaticIdentityProvider);
    gate.rehydrate().unwrap();

    assert_matches!(
        gate.login("root", "root").unwrap_err(),
        DatamartError::InvalidCredentials
    );
    assert_eq!(gate.store().get(AUTH_FLAG_KEY).unwrap(), None);
    assert_eq!(gate.store().get(USER_KEY).unwrap(), None);
}

#[test]
fn corrupt_persisted_user_resets_to_logged_out() {
    let temp = tempfile::tempdir().unwrap();
    {
        let store = file_store(&temp);
        store.set(AUTH_FLAG_KEY, "true").unwrap();
        store.set(USER_KEY, "{\"username\": truncated").unwrap();
    }

    let mut gate = SessionGate::new(file_store(&temp), StaticIdentityProvider);
    gate.rehydrate().unwrap();
    assert_eq!(*gate.state(), AuthState::Unauthenticated);
    // both keys discarded
    assert_eq!(gate.store().get(AUTH_FLAG_KEY).unwrap(), None);
    assert_eq!(gate.store().get(USER_KEY).unwrap(), None);
}

#[test]
fn flag_without_user_record_stays_logged_out() {
    let temp = tempfile::tempdir().unwrap();
    {
        let store = file_store(&temp);
        store.set(AUTH_FLAG_KEY, "true").unwrap();
    }

    let mut gate = SessionGate::new(file_store(&temp), StaticIdentityProvider);
    gate.rehydrate().unwrap();
    assert_eq!(*gate.state(), AuthState::Unauthenticated);
}
