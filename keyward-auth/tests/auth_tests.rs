use keyward_auth::{AuthGate, AuthRequest, ReleaseCatalog, UpdateInfo};
use keyward_license::LicenseKey;
use keyward_store::{ArtifactRecord, EntitlementStore, NewUser, User};
use keyward_types::{AuthResult, Platform, UnixMillis, Version};
use pretty_assertions::assert_eq;

const BASE: &str = "https://downloads.example.com/";

fn gate() -> (EntitlementStore, AuthGate) {
    let store = EntitlementStore::open_in_memory().unwrap();
    let gate = AuthGate::new(store.clone(), ReleaseCatalog::new(BASE));
    (store, gate)
}

fn seed(store: &EntitlementStore, email: &str, active: bool) -> User {
    store
        .transaction(|tx| {
            tx.insert_user(
                NewUser {
                    email: email.to_string(),
                    name: "Ada Lovelace".to_string(),
                    customer_id: format!("cus_{email}"),
                    subscription_id: Some(format!("sub_{email}")),
                    license_key: LicenseKey::generate(),
                    active,
                    last_event_at: None,
                },
                UnixMillis::now(),
            )
        })
        .unwrap()
}

fn request(user: &User, version: u32) -> AuthRequest {
    AuthRequest {
        email: user.email.clone(),
        license_key: user.license_key.as_str().to_string(),
        os: Platform::MacArm,
        version: Version::new(version),
    }
}

fn artifact(version: u32, os: Platform) -> ArtifactRecord {
    ArtifactRecord {
        version: Version::new(version),
        os,
        app_hash: format!("app{version}"),
        update_hash: format!("upd{version}"),
    }
}

// ── Credentials ──────────────────────────────────────────────────

#[test]
fn valid_credentials_open_session() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", true);

    let outcome = gate.authenticate(&request(&user, 220905)).unwrap();

    assert_eq!(outcome.result, AuthResult::SuccessUnlocked);
    assert_eq!(outcome.locked_version, None);
    let session = store.session(outcome.session_id.unwrap()).unwrap().unwrap();
    assert_eq!(session.user_id, user.id);
    assert_eq!(session.heartbeats, 1);
    assert_eq!(session.started_at, session.last_heartbeat_at);
}

#[test]
fn each_auth_opens_its_own_session() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", true);

    let first = gate.authenticate(&request(&user, 220905)).unwrap();
    let second = gate.authenticate(&request(&user, 220905)).unwrap();
    assert_ne!(first.session_id, second.session_id);
}

#[test]
fn key_is_accepted_without_dashes_and_in_lower_case() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", true);

    let mut req = request(&user, 220905);
    req.license_key = user.license_key.as_str().replace('-', "").to_lowercase();
    req.email = "  A@Example.com ".to_string();

    assert_eq!(gate.authenticate(&req).unwrap().result, AuthResult::SuccessUnlocked);
}

#[test]
fn unknown_email_and_wrong_key_look_the_same() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", true);

    let mut wrong_key = request(&user, 220905);
    wrong_key.license_key = LicenseKey::generate().as_str().to_string();
    let mut unknown = request(&user, 220905);
    unknown.email = "nobody@example.com".to_string();

    let a = gate.authenticate(&wrong_key).unwrap();
    let b = gate.authenticate(&unknown).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.result, AuthResult::FailInvalidCredentials);
    assert_eq!(a.session_id, None);
}

#[test]
fn garbage_key_is_invalid_credentials() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", true);
    let mut req = request(&user, 220905);
    req.license_key = "not a key".to_string();
    assert_eq!(gate.authenticate(&req).unwrap().result, AuthResult::FailInvalidCredentials);
}

#[test]
fn inactive_user_is_rejected() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", false);

    let outcome = gate.authenticate(&request(&user, 220905)).unwrap();
    assert_eq!(outcome.result, AuthResult::FailUserInactive);
    assert_eq!(outcome.session_id, None);
}

#[test]
fn zero_version_is_invalid() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", true);
    let outcome = gate.authenticate(&request(&user, 0)).unwrap();
    assert_eq!(outcome.result, AuthResult::FailInvalidVersion);
}

#[test]
fn verify_credentials_ignores_activation() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", false);

    let found = gate
        .verify_credentials(&user.email, user.license_key.as_str())
        .unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
}

// ── Version lock ─────────────────────────────────────────────────

#[test]
fn version_lock_rejects_newer_clients() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", true);
    store.set_locked_version(user.id, Some(Version::new(5))).unwrap();

    let newer = gate.authenticate(&request(&user, 6)).unwrap();
    assert_eq!(newer.result, AuthResult::FailVersionLocked);
    assert_eq!(newer.locked_version, Some(Version::new(5)));
    assert_eq!(newer.session_id, None);

    for version in [5, 4] {
        let outcome = gate.authenticate(&request(&user, version)).unwrap();
        assert_eq!(outcome.result, AuthResult::SuccessLocked, "version {version}");
        assert_eq!(outcome.locked_version, Some(Version::new(5)));
        assert!(outcome.session_id.is_some());
    }
}

#[test]
fn inactive_wins_over_version_lock() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", false);
    store.set_locked_version(user.id, Some(Version::new(5))).unwrap();

    let outcome = gate.authenticate(&request(&user, 6)).unwrap();
    assert_eq!(outcome.result, AuthResult::FailUserInactive);
}

// ── Updates ──────────────────────────────────────────────────────

#[test]
fn older_client_gets_update() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", true);
    store.put_artifact(&artifact(220905, Platform::MacArm)).unwrap();
    store.put_artifact(&artifact(221001, Platform::MacArm)).unwrap();
    store.put_artifact(&artifact(230101, Platform::WindowsX64)).unwrap();

    let outcome = gate.authenticate(&request(&user, 220905)).unwrap();

    assert_eq!(
        outcome.update,
        Some(UpdateInfo {
            version: Version::new(221001),
            download_url: "https://downloads.example.com/update/mac-arm-22.10.1.zip".to_string(),
            download_hash: "upd221001".to_string(),
            installer_url: "https://downloads.example.com/app/mac-arm-22.10.1.zip".to_string(),
            installer_hash: "app221001".to_string(),
        })
    );
}

#[test]
fn current_client_gets_no_update() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", true);
    store.put_artifact(&artifact(221001, Platform::MacArm)).unwrap();

    let outcome = gate.authenticate(&request(&user, 221001)).unwrap();
    assert_eq!(outcome.update, None);
}

#[test]
fn locked_user_is_offered_only_releases_up_to_the_lock() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", true);
    store.set_locked_version(user.id, Some(Version::new(221001))).unwrap();
    store.put_artifact(&artifact(221001, Platform::MacArm)).unwrap();
    store.put_artifact(&artifact(230101, Platform::MacArm)).unwrap();

    let outcome = gate.authenticate(&request(&user, 220905)).unwrap();
    assert_eq!(outcome.result, AuthResult::SuccessLocked);
    assert_eq!(outcome.update.map(|u| u.version), Some(Version::new(221001)));
}

#[test]
fn trial_is_unlocked_and_offered_newest_release() {
    let (store, gate) = gate();
    store.put_artifact(&artifact(230101, Platform::MacArm)).unwrap();

    let outcome = gate.trial(Platform::MacArm, Version::new(220905)).unwrap();

    assert_eq!(outcome.result, AuthResult::SuccessUnlocked);
    assert_eq!(outcome.session_id, None);
    assert_eq!(outcome.update.map(|u| u.version), Some(Version::new(230101)));
}

#[test]
fn trial_rejects_invalid_version() {
    let (_store, gate) = gate();
    let outcome = gate.trial(Platform::MacArm, Version::new(0)).unwrap();
    assert_eq!(outcome.result, AuthResult::FailInvalidVersion);
}

#[test]
fn outcome_serializes_result_as_code() {
    let (store, gate) = gate();
    let user = seed(&store, "a@example.com", false);
    let outcome = gate.authenticate(&request(&user, 220905)).unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["result"], 5);
    assert!(json["session_id"].is_null());
}

// ── Catalog ──────────────────────────────────────────────────────

#[test]
fn catalog_builds_locators() {
    let catalog = ReleaseCatalog::new("https://dl.example.com");
    assert_eq!(
        catalog.update_url(Version::new(220900), Platform::LinuxX64),
        "https://dl.example.com/update/linux-x64-22.09.zip"
    );
    assert_eq!(
        catalog.installer_url(Version::new(220905), Platform::WindowsX64),
        "https://dl.example.com/app/windows-x64-22.09.5.zip"
    );
}
