use tollgate::{
    Drivers,
    crypt::EncryptDriver,
    registry::{DriverRegistry, Identity, IdentityKind, Registration, RegistryError},
};

#[test]
fn test_builtin_listings() {
    let drivers = Drivers::builtin().unwrap();

    let storage = drivers.list_members("storage").unwrap();
    let names: Vec<&str> = storage.iter().map(|info| info.name.as_str()).collect();
    assert!(names.contains(&"memory"));
    assert!(names.contains(&"jsonfile"));
    #[cfg(feature = "sqlite")]
    assert!(names.contains(&"sqlite"));
    assert!(storage.iter().all(|info| !info.short_help.is_empty()));

    let encryption = drivers.list_members("encryption").unwrap();
    let plaintext = encryption
        .iter()
        .find(|info| info.name == "plaintext")
        .unwrap();
    assert!(plaintext.test_only);
    assert!(!plaintext.is_default);
}

#[test]
fn test_unknown_driver_is_configuration_error() {
    let drivers = Drivers::builtin().unwrap();
    let err = drivers.store("postgres").unwrap_err();
    assert!(err.is_configuration_error());
    assert_eq!(err.module(), "registry");
}

#[test]
fn test_long_help_describes_options() {
    let drivers = Drivers::builtin().unwrap();
    let help = drivers
        .help("encryption", "sha512", IdentityKind::Long)
        .unwrap();
    assert!(help.contains("Cost"));
}

#[test]
fn test_test_only_driver_cannot_be_default() {
    let registry: DriverRegistry<dyn EncryptDriver> = DriverRegistry::new("encryption");
    tollgate::crypt::register_drivers(&registry).unwrap();
    let err = registry.set_default("plaintext").unwrap_err();
    assert!(matches!(err, RegistryError::TestOnlyDefault { .. }));

    // Still usable when asked for by name.
    let driver = registry.create("plaintext").unwrap();
    assert_eq!(driver.id(), "plaintext");
}

#[test]
fn test_custom_registry_without_default() {
    fn create() -> Box<dyn EncryptDriver> {
        Box::new(tollgate::crypt::drivers::sha512::Sha512Driver::default())
    }

    let registry: DriverRegistry<dyn EncryptDriver> = DriverRegistry::new("encryption");
    registry
        .register(Registration::new("iterated", "short", "long", create))
        .unwrap();
    assert!(matches!(
        registry.new_default(),
        Err(RegistryError::NoDefault { .. })
    ));
    registry.set_default("iterated").unwrap();
    assert!(registry.new_default().is_ok());
    assert!(
        registry
            .register(Registration::new("iterated", "again", "again", create))
            .unwrap_err()
            .is_duplicate()
    );
}
