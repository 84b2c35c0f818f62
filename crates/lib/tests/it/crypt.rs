use tollgate::Drivers;

const USER_SALT: &str = "3f9a0c2e1b7d4e6f";

fn drivers() -> Drivers {
    Drivers::builtin().unwrap()
}

#[test]
fn test_every_driver_round_trips() {
    let drivers = drivers();
    for (name, options) in [
        ("argon2", r#"{"Cost": 1}"#),
        ("sha512", r#"{"Cost": 2}"#),
        ("plaintext", ""),
    ] {
        let crypt = drivers.encryption(name, options).unwrap();
        let hash = crypt.encrypt_password("pw1", USER_SALT).unwrap();
        assert!(crypt.compare_passwords(&hash, "pw1", USER_SALT), "{name}");
        assert!(!crypt.compare_passwords(&hash, "pw2", USER_SALT), "{name}");
        assert!(!crypt.compare_passwords(&hash, "pw1", "other-salt"), "{name}");
    }
}

#[test]
fn test_different_salts_give_different_hashes() {
    let drivers = drivers();
    for (name, options) in [
        ("argon2", r#"{"Cost": 1}"#),
        ("sha512", r#"{"Cost": 2}"#),
        ("plaintext", ""),
    ] {
        let crypt = drivers.encryption(name, options).unwrap();
        let first = crypt.encrypt_password("pw1", USER_SALT).unwrap();
        let second = crypt.encrypt_password("pw1", "7c1e5a90d2b84f36").unwrap();
        assert_ne!(first, second, "{name}");
        assert!(crypt.compare_passwords(&second, "pw1", "7c1e5a90d2b84f36"), "{name}");
    }
}

#[test]
fn test_argon2_output_is_phc() {
    let crypt = drivers().encryption("argon2", r#"{"Cost": 1}"#).unwrap();
    let hash = crypt.encrypt_password("pw1", USER_SALT).unwrap();
    assert!(hash.starts_with("$argon2id$v=19$"));
    assert!(hash.contains("t=1"));

    // Each hash gets a fresh random salt.
    let again = crypt.encrypt_password("pw1", USER_SALT).unwrap();
    assert_ne!(hash, again);
    assert!(crypt.compare_passwords(&again, "pw1", USER_SALT));
}

#[test]
fn test_sha512_is_deterministic() {
    let crypt = drivers().encryption("sha512", "").unwrap();
    let a = crypt.encrypt_password("pw1", USER_SALT).unwrap();
    let b = crypt.encrypt_password("pw1", USER_SALT).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_driver_salt_change_breaks_old_hashes() {
    let drivers = drivers();
    let before = drivers
        .encryption("sha512", r#"{"Salt": "first"}"#)
        .unwrap();
    let after = drivers
        .encryption("sha512", r#"{"Salt": "second"}"#)
        .unwrap();
    let hash = before.encrypt_password("pw1", USER_SALT).unwrap();
    assert!(!after.compare_passwords(&hash, "pw1", USER_SALT));

    let shifted = drivers
        .encryption("sha512", r#"{"Salt": "first", "StaticSaltIndex": 3}"#)
        .unwrap();
    assert!(!shifted.compare_passwords(&hash, "pw1", USER_SALT));
}

#[test]
fn test_bad_options_fail_selection() {
    let err = drivers().encryption("argon2", "{not json").err().unwrap();
    assert!(err.is_configuration_error());
    assert_eq!(err.status_code(), 500);
}
